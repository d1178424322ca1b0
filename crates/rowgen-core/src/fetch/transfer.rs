//! Streamed HTTP/FTP transfer into a writer via curl.

use crate::cancel::CancelToken;
use crate::config::RowgenConfig;
use crate::error::{FetchCause, Result, RowgenError};
use std::io::{self, Write};
use std::time::Duration;

/// Curl options applied to every transfer.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub connect_timeout: Duration,
    /// Whole-transfer limit; `None` leaves it to the transport.
    pub timeout: Option<Duration>,
    /// Receive buffer size in bytes.
    pub buffer_bytes: usize,
    pub user_agent: Option<String>,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self::from(&RowgenConfig::default())
    }
}

impl From<&RowgenConfig> for TransferSettings {
    fn from(cfg: &RowgenConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
            buffer_bytes: cfg.buffer_bytes,
            user_agent: cfg.user_agent.clone(),
        }
    }
}

fn fetch_err(url: &str, status: Option<u32>, cause: FetchCause) -> RowgenError {
    RowgenError::Fetch {
        url: url.to_string(),
        status,
        cause,
    }
}

/// Streams `url` into `sink`. Content encodings are decoded transparently;
/// statuses of 400 and above become [`RowgenError::Fetch`] carrying the
/// status. Returns the number of bytes written.
pub(crate) fn curl_transfer(
    url: &str,
    settings: &TransferSettings,
    cancel: Option<&CancelToken>,
    sink: &mut dyn Write,
) -> Result<u64> {
    let curl_err = |e: curl::Error| fetch_err(url, None, FetchCause::Curl(e));

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(curl_err)?;
    easy.follow_location(true).map_err(curl_err)?;
    easy.max_redirections(10).map_err(curl_err)?;
    easy.fail_on_error(true).map_err(curl_err)?;
    // empty string: accept every encoding curl was built with
    easy.accept_encoding("").map_err(curl_err)?;
    easy.buffer_size(settings.buffer_bytes).map_err(curl_err)?;
    easy.connect_timeout(settings.connect_timeout).map_err(curl_err)?;
    if let Some(t) = settings.timeout {
        easy.timeout(t).map_err(curl_err)?;
    }
    if let Some(ua) = &settings.user_agent {
        easy.useragent(ua).map_err(curl_err)?;
    }

    let mut written: u64 = 0;
    let mut write_err: Option<io::Error> = None;
    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return Ok(0);
                }
                match sink.write_all(data) {
                    Ok(()) => {
                        written += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        write_err = Some(e);
                        Ok(0) // abort transfer
                    }
                }
            })
            .map_err(curl_err)?;
        transfer.perform()
    };

    if let Err(e) = performed {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(RowgenError::Cancelled {
                url: url.to_string(),
            });
        }
        if let Some(io_err) = write_err {
            return Err(fetch_err(url, None, FetchCause::Io(io_err)));
        }
        if e.is_http_returned_error() {
            let code = easy.response_code().unwrap_or(0);
            return Err(fetch_err(url, Some(code), FetchCause::Http(code)));
        }
        return Err(curl_err(e));
    }

    let code = easy.response_code().map_err(curl_err)?;
    tracing::debug!(url, code, bytes = written, "transfer finished");
    Ok(written)
}
