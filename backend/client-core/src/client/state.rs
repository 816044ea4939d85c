/// Lifecycle of a registered client.
///
/// ```text
/// initialize ──► Idle ◄──stop_polling── Polling
///                 │  └──start_polling──►
///                 └──close──► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Polling,
    Closed,
}
