//! Queries about modules loaded into the current process.

use crate::error::PatchFault;

/// Where a module is mapped in the current process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedModule {
    pub base: usize,
    pub image_size: usize,
}

/// Source of loaded-module information.
///
/// The system implementation asks the OS loader; tests substitute a fake
/// host backed by heap buffers.
pub trait ModuleHost: Send + Sync {
    /// Look up a loaded module by file name.
    ///
    /// Returns `ModuleNotLoaded` or `ModuleInfoUnavailable`, both of which
    /// are transient.
    fn loaded_module(&self, name: &str) -> Result<LoadedModule, PatchFault>;
}

/// Module host backed by the OS loader of the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

#[cfg(target_os = "windows")]
impl ModuleHost for SystemHost {
    fn loaded_module(&self, name: &str) -> Result<LoadedModule, PatchFault> {
        use windows::Win32::System::LibraryLoader::GetModuleHandleW;
        use windows::Win32::System::ProcessStatus::{GetModuleInformation, MODULEINFO};
        use windows::Win32::System::Threading::GetCurrentProcess;
        use windows::core::HSTRING;

        let wide = HSTRING::from(name);
        // SAFETY: GetModuleHandleW does not take a reference on the module and
        // only reads the name we pass in.
        let module = unsafe { GetModuleHandleW(&wide) }
            .map_err(|_| PatchFault::ModuleNotLoaded(name.to_string()))?;

        let mut info = MODULEINFO::default();
        // SAFETY: info is a valid, writable MODULEINFO and cb matches its size.
        unsafe {
            GetModuleInformation(
                GetCurrentProcess(),
                module,
                &mut info,
                std::mem::size_of::<MODULEINFO>() as u32,
            )
        }
        .map_err(|_| PatchFault::ModuleInfoUnavailable(name.to_string()))?;

        Ok(LoadedModule {
            base: info.lpBaseOfDll as usize,
            image_size: info.SizeOfImage as usize,
        })
    }
}

#[cfg(not(target_os = "windows"))]
impl ModuleHost for SystemHost {
    fn loaded_module(&self, name: &str) -> Result<LoadedModule, PatchFault> {
        Err(PatchFault::ModuleNotLoaded(name.to_string()))
    }
}
