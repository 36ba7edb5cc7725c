// BME280 register map.
// cf. https://trac.switch-science.com/wiki/BME280

/// BME280 I2C slave address with SDO pulled high.
pub const ADDR_BME280: u16 = 0x77;
/// BME280 I2C slave address with SDO pulled low.
pub const ADDR_BME280_ALT: u16 = 0x76;

/// Value read back from `Register::ChipId` on a genuine BME280.
pub const CHIP_ID_BME280: u8 = 0x60;
/// Writing this to `Register::Reset` runs the power-on-reset procedure.
pub const RESET_CMD: u8 = 0xB6;

/// Mode bits of `ctrl_meas`. `00` is sleep.
pub const MODE_MASK: u8 = 0x03;
pub const MODE_SLEEP: u8 = 0x00;
pub const MODE_FORCED: u8 = 0x01;

/// Register addresses the driver touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// 0x88 - 0xA1, temperature and pressure coefficients plus H1.
    CalibA = 0x88,
    ChipId = 0xD0,
    Reset = 0xE0,
    /// 0xE1 - 0xE8, humidity coefficients.
    CalibB = 0xE1,
    CtrlHum = 0xF2,
    CtrlMeas = 0xF4,
    Config = 0xF5,
    /// 0xF7 - 0xFE, press_msb .. hum_lsb.
    Data = 0xF7,
}

impl Register {
    pub fn addr(self) -> u8 {
        self as u8
    }

    /// Number of bytes in the block starting at this register, 1 for single registers.
    pub fn block_len(self) -> usize {
        match self {
            Register::CalibA => 26,
            Register::CalibB => 8,
            Register::Data => 8,
            _ => 1,
        }
    }
}
