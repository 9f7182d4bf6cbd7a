//! Connection initialisation: `connection_init` out, `connection_ack` back.

use crate::error::{HandshakeError, SessionError};
use crate::session::Transport;
use powerctl_protocol::{InitPayload, MessageKind};
use std::time::Duration;

/// How long to wait for `connection_ack` by default.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticates an open session.
///
/// Sends `connection_init` carrying the token and waits up to `ack_timeout`
/// for `connection_ack`. The first frame received must be the ack; anything
/// else fails the handshake. The session is left open either way; closing it
/// is the caller's job.
pub async fn perform_init<T>(
    session: &mut T,
    token: &str,
    ack_timeout: Duration,
) -> Result<(), HandshakeError>
where
    T: Transport + ?Sized,
{
    let init = InitPayload::new(token)
        .into_envelope()
        .map_err(|e| HandshakeError::Send(SessionError::Encode(e)))?;
    session.send(&init).await.map_err(HandshakeError::Send)?;
    tracing::debug!("Sent connection_init, waiting for ack...");

    match session.receive(Some(ack_timeout)).await {
        Ok(envelope) if envelope.kind() == MessageKind::ConnectionAck => {
            tracing::debug!("Connection acknowledged");
            Ok(())
        }
        Ok(envelope) => Err(HandshakeError::UnexpectedMessage(envelope.kind())),
        Err(SessionError::Timeout) => Err(HandshakeError::Timeout(ack_timeout)),
        Err(SessionError::Closed) => Err(HandshakeError::Closed),
        Err(SessionError::Decode(e)) => Err(HandshakeError::Malformed(e)),
        Err(e) => Err(HandshakeError::Transport(e)),
    }
}
