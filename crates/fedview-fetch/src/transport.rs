//! Mapping of `reqwest` failures onto [`FetchError`].

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use fedview_core::{duration_millis, host_of, FetchError};

/// Converts a client error into a raw fetch error.
///
/// The source chain is walked so that DNS failures and refused connections,
/// which `reqwest` only reports as generic connect errors, keep their cause.
pub fn map_reqwest_error(err: &reqwest::Error, url: &str, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        return FetchError::timeout(url, duration_millis(timeout));
    }

    let host = host_of(url).unwrap_or_else(|| url.to_string());
    if let Some(cause) = connect_cause(err) {
        return match cause {
            ConnectCause::Dns => FetchError::Dns { host },
            ConnectCause::Refused => FetchError::ConnectionRefused { host },
            ConnectCause::TimedOut => FetchError::timeout(url, duration_millis(timeout)),
        };
    }

    if err.is_decode() {
        return FetchError::parse(url, err.to_string());
    }

    FetchError::transport(describe(err))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectCause {
    Dns,
    Refused,
    TimedOut,
}

fn connect_cause(err: &(dyn StdError + 'static)) -> Option<ConnectCause> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => return Some(ConnectCause::Refused),
                io::ErrorKind::TimedOut => return Some(ConnectCause::TimedOut),
                _ => {}
            }
        }
        let text = source.to_string().to_ascii_lowercase();
        if text.contains("dns error")
            || text.contains("failed to lookup address")
            || text.contains("name or service not known")
            || text.contains("no such host")
        {
            return Some(ConnectCause::Dns);
        }
        if text.contains("connection refused") {
            return Some(ConnectCause::Refused);
        }
        current = source.source();
    }
    None
}

fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
