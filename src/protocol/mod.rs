//! RS-485 protocol engine.
//!
//! ```text
//!          ┌──────────────────────────────────────────────┐
//!   UART ─▶│ HalfDuplexTransceiver (DE/RE · turnaround)   │─▶ UART
//!          └──────┬───────────────────────────────▲───────┘
//!                 │ bytes                         │ frame
//!          ┌──────▼──────────┐             ┌──────┴───────┐
//!          │ FrameReceiver   │  payload    │ codec::encode│
//!          │ Idle/Accumulate │────────────▶│ codec::decode│──▶ Message
//!          └─────────────────┘             └──────────────┘
//! ```
//!
//! | Module        | Role                                              |
//! |---------------|---------------------------------------------------|
//! | `codec`       | `<TAG|field|…>` text frames ↔ [`Message`](codec::Message) |
//! | `receiver`    | Byte-at-a-time frame delimiting, bounded buffer   |
//! | `transceiver` | Drive/listen switching around each transmit       |
//! | `transport`   | Byte channel trait implemented by the UART        |

pub mod codec;
pub mod receiver;
pub mod transceiver;
pub mod transport;
