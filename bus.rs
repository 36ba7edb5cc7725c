use log::debug;
use rppal::i2c::I2c;

/// Register-addressed access to a device on a shared bus.
///
/// Implementations do not serialize access between callers; whoever shares one bus
/// handle across threads wraps it in a mutex.
pub trait BusPort {
    type Error;

    fn read_byte(&mut self, addr: u16, reg: u8) -> Result<u8, Self::Error>;

    /// Reads `buf.len()` consecutive registers starting at `reg`.
    fn read_block(&mut self, addr: u16, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    fn write_byte(&mut self, addr: u16, reg: u8, value: u8) -> Result<(), Self::Error>;
}

impl BusPort for I2c {
    type Error = rppal::i2c::Error;

    fn read_byte(&mut self, addr: u16, reg: u8) -> Result<u8, Self::Error> {
        self.set_slave_address(addr)?;
        self.smbus_read_byte(reg)
    }

    fn read_block(&mut self, addr: u16, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.set_slave_address(addr)?;
        for (n, byte) in buf.iter_mut().enumerate() {
            *byte = self.smbus_read_byte(reg.wrapping_add(n as u8))?;
        }
        debug!("0x{:02X} read 0x{:02X}: {:02X?}", addr, reg, buf);
        Ok(())
    }

    fn write_byte(&mut self, addr: u16, reg: u8, value: u8) -> Result<(), Self::Error> {
        self.set_slave_address(addr)?;
        debug!("0x{:02X} write 0x{:02X}=0x{:02X}", addr, reg, value);
        self.smbus_write_byte(reg, value)
    }
}
