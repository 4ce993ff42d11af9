//! Hardware-backed implementations of the core's access boundaries.

pub mod gpio_board;
pub mod uinput_sink;
