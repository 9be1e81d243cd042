//! GPIO / peripheral pin assignments for the bridge board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// RS-485 transceiver (MAX485)
// ---------------------------------------------------------------------------

/// Digital output driving both DE and RE on the MAX485.
/// HIGH = drive the bus (transmit), LOW = listen (receive).
pub const RS485_DE_RE_GPIO: i32 = 4;
/// UART2 RX, wired to MAX485 RO.
pub const RS485_RX_GPIO: i32 = 16;
/// UART2 TX, wired to MAX485 DI.
pub const RS485_TX_GPIO: i32 = 17;
/// UART peripheral used for the bus.
pub const RS485_UART_NUM: u8 = 2;

// ---------------------------------------------------------------------------
// HX711 load cell amplifier
// ---------------------------------------------------------------------------

/// Digital input: HX711 DOUT (LOW = conversion ready).
pub const HX711_DOUT_GPIO: i32 = 25;
/// Digital output: HX711 PD_SCK.
pub const HX711_SCK_GPIO: i32 = 26;
