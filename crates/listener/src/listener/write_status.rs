//! Wiring between channel write tokens and the response status of the exchange.
//!
//! A response may take several writes. Intermediate writes only ever report failures
//! to the status; the write that finishes the response reports its outcome either way.
//! Since the status fires once, the first failure wins over anything that follows.

use tracing::{trace, warn};

use crate::connection::WriteToken;
use crate::protocol::{ExchangeError, PeerClosedReason, RequestMessage, ResponseStatus};

/// Fails `status` if the write behind `token` fails; a success is not reported.
pub(crate) fn notify_if_write_failure(status: &ResponseStatus, token: &WriteToken, reason: PeerClosedReason) {
    let status = status.clone();
    token.on_complete(move |result| {
        if let Err(e) = result {
            let cause = ExchangeError::from_write_failure(e, reason);
            warn!(%cause, "response write failed");
            status.fail(cause);
        }
    });
}

/// Reports the outcome of the final write of a response, succeeding with `request`.
pub(crate) fn check_for_response_write_status(
    request: RequestMessage,
    status: &ResponseStatus,
    token: &WriteToken,
    reason: PeerClosedReason,
) {
    let status = status.clone();
    token.on_complete(move |result| match result {
        Ok(()) => {
            trace!("response fully written");
            status.succeed(request);
        }
        Err(e) => {
            let cause = ExchangeError::from_write_failure(e, reason);
            warn!(%cause, "final response write failed");
            status.fail(cause);
        }
    });
}
