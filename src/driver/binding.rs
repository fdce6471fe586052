/*!
 * Driver Binding
 * Owned handle to the dynamically-loaded device-management library
 *
 * The library supplies device enumeration and id-translation queries only.
 * Binding or symbol-resolution failure surfaces as DriverUnavailable; the
 * library is unloaded when the binding drops.
 */

use crate::core::{HookError, HookResult};
use libloading::{Library, Symbol};
use log::{debug, info};
use std::os::raw::{c_int, c_uint};

/// Well-known name the vendor library is loaded under
const DRIVER_LIB: &str = "libdcmi.so";

/// Upper bound on cards returned by enumeration
const MAX_CARD_NUM: usize = 16;

type InitFn = unsafe extern "C" fn() -> c_int;
type CardListFn = unsafe extern "C" fn(*mut c_int, *mut c_int, c_int) -> c_int;
type DeviceCountFn = unsafe extern "C" fn(c_int, *mut c_int) -> c_int;
type LogicalIdFn = unsafe extern "C" fn(*mut c_int, c_int, c_int) -> c_int;
type LogicalFromPhysicalFn = unsafe extern "C" fn(c_uint, *mut c_uint) -> c_int;

/// Owned binding to the vendor library.
#[derive(Debug)]
pub struct DriverBinding {
    lib: Library,
}

impl DriverBinding {
    /// Load the library at its fixed well-known name.
    pub fn load() -> HookResult<Self> {
        Self::load_from(DRIVER_LIB)
    }

    fn load_from(name: &str) -> HookResult<Self> {
        let lib = unsafe { Library::new(name) }.map_err(|err| {
            HookError::DriverUnavailable(format!("cannot load {}: {}", name, err))
        })?;
        debug!("loaded driver library {}", name);
        Ok(Self { lib })
    }

    fn symbol<T>(&self, name: &str) -> HookResult<Symbol<'_, T>> {
        unsafe { self.lib.get(name.as_bytes()) }.map_err(|err| {
            HookError::DriverUnavailable(format!("cannot resolve symbol {}: {}", name, err))
        })
    }

    /// Initialize the management library.
    pub fn init(&self) -> HookResult<()> {
        let init: Symbol<'_, InitFn> = self.symbol("dcmi_init")?;
        let ret = unsafe { init() };
        if ret != 0 {
            return Err(HookError::DriverUnavailable(format!(
                "dcmi_init returned {}",
                ret
            )));
        }
        Ok(())
    }

    /// Enumerate the installed card ids.
    pub fn list_cards(&self) -> HookResult<Vec<i32>> {
        let list: Symbol<'_, CardListFn> = self.symbol("dcmi_get_card_num_list")?;
        let mut count: c_int = 0;
        let mut ids = [0 as c_int; MAX_CARD_NUM];
        let ret = unsafe { list(&mut count, ids.as_mut_ptr(), MAX_CARD_NUM as c_int) };
        if ret != 0 {
            return Err(HookError::DriverUnavailable(format!(
                "dcmi_get_card_num_list returned {}",
                ret
            )));
        }
        let count = count.clamp(0, MAX_CARD_NUM as c_int) as usize;
        Ok(ids[..count].to_vec())
    }

    /// Number of devices on a card.
    pub fn device_count(&self, card: i32) -> HookResult<i32> {
        let query: Symbol<'_, DeviceCountFn> = self.symbol("dcmi_get_device_num_in_card")?;
        let mut count: c_int = 0;
        let ret = unsafe { query(card, &mut count) };
        if ret != 0 {
            return Err(HookError::DriverUnavailable(format!(
                "dcmi_get_device_num_in_card({}) returned {}",
                card, ret
            )));
        }
        Ok(count)
    }

    /// Logical id of a device addressed by card and device index.
    pub fn logical_id(&self, card: i32, device: i32) -> HookResult<u32> {
        let query: Symbol<'_, LogicalIdFn> = self.symbol("dcmi_get_device_logic_id")?;
        let mut logical: c_int = 0;
        let ret = unsafe { query(&mut logical, card, device) };
        if ret != 0 {
            return Err(HookError::DriverUnavailable(format!(
                "dcmi_get_device_logic_id({}, {}) returned {}",
                card, device, ret
            )));
        }
        u32::try_from(logical).map_err(|_| {
            HookError::DriverUnavailable(format!("negative logical id {}", logical))
        })
    }

    /// Logical id of a device addressed by its physical id.
    pub fn logical_id_from_physical(&self, physical: u32) -> HookResult<u32> {
        let query: Symbol<'_, LogicalFromPhysicalFn> =
            self.symbol("dcmi_get_device_logicid_from_phyid")?;
        let mut logical: c_uint = 0;
        let ret = unsafe { query(physical, &mut logical) };
        if ret != 0 {
            return Err(HookError::DriverUnavailable(format!(
                "dcmi_get_device_logicid_from_phyid({}) returned {}",
                physical, ret
            )));
        }
        Ok(logical)
    }

    /// Unload the library.
    pub fn shutdown(self) {
        info!("unloading driver library");
        // drop closes the handle
    }
}
