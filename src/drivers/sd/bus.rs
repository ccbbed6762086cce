//! Synchronous serial bus abstraction for the SD transport.

/// A blocking, byte-at-a-time synchronous serial bus (clock, data-in,
/// data-out) plus the card's chip-select line.
///
/// Implementations drive real pins on hardware; tests substitute a scripted
/// mock. The bus idles high: clocking with nothing to say sends `0xFF`.
pub trait SpiBus {
    /// Shift one byte out while shifting one byte in.
    fn transfer(&mut self, out: u8) -> u8;

    /// Assert chip select (active low on SD cards).
    fn select(&mut self);

    /// Deassert chip select.
    fn deselect(&mut self);
}
