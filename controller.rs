use std::thread;

use log::{debug, error, info};

use crate::bus::BusPort;
use crate::calibration;
use crate::error::{Error, Result};
use crate::registers::{Register, MODE_MASK, MODE_SLEEP, RESET_CMD};
use crate::settings::Settings;
use crate::structs::{CalibrationSet, RawSample};

/// Where the controller is in its bring-up / acquisition cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Configured,
    Acquiring,
    DataReady,
    /// Mode verification or a bus transaction failed. Only `initialize` leaves this state.
    Faulted,
}

/// Drives one BME280 in forced mode.
///
/// The controller owns its bus handle for as long as it lives. Sharing the bus with
/// other devices is the caller's business.
pub struct SensorController<B> {
    bus: B,
    settings: Settings,
    state: ControllerState,
}

impl<B: BusPort> SensorController<B> {
    pub fn new(bus: B, settings: Settings) -> Self {
        SensorController {
            bus,
            settings,
            state: ControllerState::Uninitialized,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gives the bus handle back.
    pub fn release(self) -> B {
        self.bus
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn bus_result<T>(&mut self, r: std::result::Result<T, B::Error>) -> Result<T, B::Error> {
        r.map_err(|e| {
            self.state = ControllerState::Faulted;
            Error::Bus(e)
        })
    }

    fn write(&mut self, reg: Register, value: u8) -> Result<(), B::Error> {
        let r = self.bus.write_byte(self.settings.address, reg.addr(), value);
        self.bus_result(r)
    }

    fn read(&mut self, reg: Register) -> Result<u8, B::Error> {
        let r = self.bus.read_byte(self.settings.address, reg.addr());
        self.bus_result(r)
    }

    fn read_block(&mut self, reg: Register, buf: &mut [u8]) -> Result<(), B::Error> {
        let r = self.bus.read_block(self.settings.address, reg.addr(), buf);
        self.bus_result(r)
    }

    /// Contents of the chip-id register, 0x60 for a BME280.
    pub fn chip_id(&mut self) -> Result<u8, B::Error> {
        self.read(Register::ChipId)
    }

    /// Reads both calibration blocks and decodes them.
    pub fn read_calibration(&mut self) -> Result<CalibrationSet, B::Error> {
        let mut block_b = [0u8; 8];
        let mut block_a = [0u8; 26];
        self.read_block(Register::CalibB, &mut block_b)?;
        self.read_block(Register::CalibA, &mut block_a)?;
        calibration::decode(&block_b, &block_a).map_err(Error::lift)
    }

    /// Resets the part, checks that it came back asleep and writes the configuration.
    ///
    /// On [`Error::ModeVerification`] the controller is `Faulted` and has written
    /// nothing but the reset; call `initialize` again before acquiring.
    pub fn initialize(&mut self) -> Result<(), B::Error> {
        self.write(Register::Reset, RESET_CMD)?;
        thread::sleep(self.settings.reset_delay);

        let ctrl_meas = self.read(Register::CtrlMeas)?;
        if ctrl_meas & MODE_MASK != MODE_SLEEP {
            self.state = ControllerState::Faulted;
            error!(
                "BME280 at 0x{:02X} not in sleep mode after reset (ctrl_meas=0x{:02X})",
                self.settings.address, ctrl_meas
            );
            return Err(Error::ModeVerification { ctrl_meas });
        }

        let s = self.settings;
        self.write(Register::Config, s.config())?;
        self.write(Register::CtrlHum, s.ctrl_hum())?;
        self.write(Register::CtrlMeas, s.ctrl_meas())?;

        self.state = ControllerState::Configured;
        info!("BME280 at 0x{:02X} configured", s.address);
        Ok(())
    }

    /// Starts a one-shot conversion.
    pub fn trigger_acquisition(&mut self) -> Result<(), B::Error> {
        match self.state {
            ControllerState::Configured | ControllerState::DataReady => {}
            state => return Err(Error::NotReady(state)),
        }
        let ctrl_meas = self.settings.ctrl_meas();
        self.write(Register::CtrlMeas, ctrl_meas)?;
        self.state = ControllerState::Acquiring;
        Ok(())
    }

    /// Blocks for the acquisition delay, then reads the data block.
    pub fn await_and_read(&mut self) -> Result<RawSample, B::Error> {
        if self.state != ControllerState::Acquiring {
            return Err(Error::NotReady(self.state));
        }
        thread::sleep(self.settings.acquisition_delay);

        let mut data = [0u8; 8];
        self.read_block(Register::Data, &mut data)?;
        self.state = ControllerState::DataReady;
        debug!("sample {:02X?}", data);
        Ok(RawSample(data))
    }

    /// One forced-mode conversion: trigger, wait, read.
    pub fn acquire_once(&mut self) -> Result<RawSample, B::Error> {
        self.trigger_acquisition()?;
        self.await_and_read()
    }
}
