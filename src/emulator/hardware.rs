/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use crate::errors::EmulatorError;

/// Maximum number of devices a `HardwareManager` accepts (§4.10).
pub const MAX_DEVICES: usize = 65_535;

/// A peripheral attached to the bus. Unlike the historical prior
/// art's `hardware_device`, which held a reference back to its owning
/// CPU, a device here only ever returns data to its caller: `tick`
/// returns an interrupt message to enqueue, if any, and `interrupt`
/// returns the extra cycle cost of servicing `HWI`. The CPU remains
/// solely responsible for touching its own registers and queue.
pub trait HardwareDevice: Send {
    fn hardware_id(&self) -> u32;
    fn manufacturer_id(&self) -> u32;
    fn version(&self) -> u16;

    /// Called once per CPU cycle. Returns `Some(message)` to raise an
    /// interrupt with that message.
    fn tick(&mut self) -> Option<u16>;

    /// Services `HWI n` for this device. Returns the number of extra
    /// cycles `HWI` should charge.
    fn interrupt(&mut self) -> u16;
}

/// Registers and dispatches to hardware devices (`HWN`/`HWQ`/`HWI`).
#[derive(Default)]
pub struct HardwareManager {
    devices: Vec<Box<dyn HardwareDevice>>,
}

impl HardwareManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_device(&mut self, device: Box<dyn HardwareDevice>) -> Result<(), EmulatorError> {
        if self.devices.len() >= MAX_DEVICES {
            return Err(EmulatorError::TooManyDevices);
        }
        self.devices.push(device);
        Ok(())
    }

    pub fn count(&self) -> u16 {
        self.devices.len() as u16
    }

    /// `HWQ n`'s id/version/manufacturer tuple, or `None` for an
    /// out-of-range index (the caller leaves registers unchanged).
    pub fn query(&self, index: u16) -> Option<(u32, u16, u32)> {
        let device = self.devices.get(index as usize)?;
        Some((device.hardware_id(), device.version(), device.manufacturer_id()))
    }

    /// `HWI n`'s extra cycle cost, or `0` for an out-of-range index.
    pub fn interrupt(&mut self, index: u16) -> u16 {
        match self.devices.get_mut(index as usize) {
            Some(device) => device.interrupt(),
            None => 0,
        }
    }

    /// Ticks every device, returning the interrupt messages raised
    /// this cycle in registration order.
    pub fn tick_all(&mut self) -> Vec<u16> {
        self.devices.iter_mut().filter_map(|device| device.tick()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubDevice {
        id: u32,
        ticks_until_interrupt: u32,
    }

    impl HardwareDevice for StubDevice {
        fn hardware_id(&self) -> u32 {
            self.id
        }
        fn manufacturer_id(&self) -> u32 {
            0xcafe
        }
        fn version(&self) -> u16 {
            1
        }
        fn tick(&mut self) -> Option<u16> {
            if self.ticks_until_interrupt == 0 {
                return None;
            }
            self.ticks_until_interrupt -= 1;
            if self.ticks_until_interrupt == 0 {
                Some(0x42)
            } else {
                None
            }
        }
        fn interrupt(&mut self) -> u16 {
            3
        }
    }

    #[test]
    fn query_reports_registered_device_and_none_past_end() {
        let mut mgr = HardwareManager::new();
        mgr.register_device(Box::new(StubDevice { id: 0x1000, ticks_until_interrupt: 0 })).unwrap();
        assert_eq!(mgr.count(), 1);
        assert_eq!(mgr.query(0), Some((0x1000, 1, 0xcafe)));
        assert_eq!(mgr.query(1), None);
    }

    #[test]
    fn tick_all_collects_raised_interrupts() {
        let mut mgr = HardwareManager::new();
        mgr.register_device(Box::new(StubDevice { id: 1, ticks_until_interrupt: 2 })).unwrap();
        mgr.register_device(Box::new(StubDevice { id: 2, ticks_until_interrupt: 0 })).unwrap();
        assert_eq!(mgr.tick_all(), Vec::<u16>::new());
        assert_eq!(mgr.tick_all(), vec![0x42]);
    }

    #[test]
    fn interrupt_past_end_is_zero_cost() {
        let mut mgr = HardwareManager::new();
        assert_eq!(mgr.interrupt(0), 0);
    }
}
