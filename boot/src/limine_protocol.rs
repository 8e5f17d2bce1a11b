//! Hand-rolled Limine boot protocol bindings.
//!
//! Requests are placed in the `.limine_requests` section where the
//! bootloader patches in response pointers before handing over control.
//! `init` snapshots everything the kernel needs; the raw request statics
//! are never touched again after that.

use core::{
    cell::UnsafeCell,
    ffi::{c_char, CStr},
    ptr, slice,
};

use ember_lib::{klog_debug, klog_info, klog_warn, FramebufferInfo};

const LIMINE_COMMON_MAGIC: [u64; 2] = [0xc7b1dd30df4c8b88, 0x0a82e883a194f07b];
const LIMINE_BASE_REVISION_MAGIC: [u64; 3] = [
    0xf9562b2d5c95a6c8,
    0x6a7b384944536bdc,
    1, /* base revision 1 */
];

const LIMINE_MEMMAP_ID: [u64; 4] = [
    LIMINE_COMMON_MAGIC[0],
    LIMINE_COMMON_MAGIC[1],
    0x67cf3d9d378a806f,
    0xe304acdfc50c3c62,
];
const LIMINE_FRAMEBUFFER_ID: [u64; 4] = [
    LIMINE_COMMON_MAGIC[0],
    LIMINE_COMMON_MAGIC[1],
    0x9d5827dcd881dd75,
    0xa3148604f6fab11b,
];
const LIMINE_MODULE_ID: [u64; 4] = [
    LIMINE_COMMON_MAGIC[0],
    LIMINE_COMMON_MAGIC[1],
    0x3e7e279702be32af,
    0xca1c4f3bd1280cee,
];
const LIMINE_BOOTLOADER_INFO_ID: [u64; 4] = [
    LIMINE_COMMON_MAGIC[0],
    LIMINE_COMMON_MAGIC[1],
    0xf55038d8e2a1202f,
    0x279426fcf5f59740,
];

pub const LIMINE_MEMMAP_USABLE: u64 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimineError {
    /// The bootloader did not acknowledge the requested base revision.
    UnsupportedRevision,
    /// No memory map response, or a response with zero entries.
    NoMemoryMap,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct LimineUuid {
    pub a: u32,
    pub b: u16,
    pub c: u16,
    pub d: [u8; 8],
}

#[repr(C)]
pub struct LimineFile {
    pub revision: u64,
    pub address: *const u8,
    pub size: u64,
    pub path: *const u8,
    pub cmdline: *const u8,
    pub media_type: u32,
    pub unused: u32,
    pub tftp_ip: u32,
    pub tftp_port: u32,
    pub partition_index: u32,
    pub mbr_disk_id: u32,
    pub gpt_disk_uuid: LimineUuid,
    pub gpt_part_uuid: LimineUuid,
    pub part_uuid: LimineUuid,
}

#[repr(C)]
pub struct LimineBaseRevision {
    pub revision: [u64; 3],
}

impl LimineBaseRevision {
    pub const fn new() -> Self {
        Self {
            revision: LIMINE_BASE_REVISION_MAGIC,
        }
    }

    pub fn supported(&self) -> bool {
        self.revision[2] == 0
    }
}

#[repr(C)]
pub struct LimineMemmapEntry {
    pub base: u64,
    pub length: u64,
    pub typ: u64,
}

#[repr(C)]
pub struct LimineMemmapResponse {
    pub revision: u64,
    pub entry_count: u64,
    pub entries: *const *const LimineMemmapEntry,
}

#[repr(C)]
pub struct LimineMemmapRequest {
    pub id: [u64; 4],
    pub revision: u64,
    pub response: *const LimineMemmapResponse,
}

impl LimineMemmapRequest {
    pub const fn new() -> Self {
        Self {
            id: LIMINE_MEMMAP_ID,
            revision: 0,
            response: ptr::null(),
        }
    }
}

#[repr(C)]
pub struct LimineFramebuffer {
    pub address: *mut u8,
    pub width: u64,
    pub height: u64,
    pub pitch: u64,
    pub bpp: u16,
    pub memory_model: u8,
    pub red_mask_size: u8,
    pub red_mask_shift: u8,
    pub green_mask_size: u8,
    pub green_mask_shift: u8,
    pub blue_mask_size: u8,
    pub blue_mask_shift: u8,
    pub unused: [u8; 7],
    pub edid_size: u64,
    pub edid: *const u8,
}

#[repr(C)]
pub struct LimineFramebufferResponse {
    pub revision: u64,
    pub framebuffer_count: u64,
    pub framebuffers: *const *const LimineFramebuffer,
}

#[repr(C)]
pub struct LimineFramebufferRequest {
    pub id: [u64; 4],
    pub revision: u64,
    pub response: *const LimineFramebufferResponse,
}

impl LimineFramebufferRequest {
    pub const fn new() -> Self {
        Self {
            id: LIMINE_FRAMEBUFFER_ID,
            revision: 0,
            response: ptr::null(),
        }
    }
}

#[repr(C)]
pub struct LimineModuleResponse {
    pub revision: u64,
    pub module_count: u64,
    pub modules: *const *const LimineFile,
}

#[repr(C)]
pub struct LimineModuleRequest {
    pub id: [u64; 4],
    pub revision: u64,
    pub response: *const LimineModuleResponse,
}

impl LimineModuleRequest {
    pub const fn new() -> Self {
        Self {
            id: LIMINE_MODULE_ID,
            revision: 0,
            response: ptr::null(),
        }
    }
}

#[repr(C)]
pub struct LimineBootloaderInfoResponse {
    pub revision: u64,
    pub name: *const c_char,
    pub version: *const c_char,
}

#[repr(C)]
pub struct LimineBootloaderInfoRequest {
    pub id: [u64; 4],
    pub revision: u64,
    pub response: *const LimineBootloaderInfoResponse,
}

impl LimineBootloaderInfoRequest {
    pub const fn new() -> Self {
        Self {
            id: LIMINE_BOOTLOADER_INFO_ID,
            revision: 0,
            response: ptr::null(),
        }
    }
}

unsafe impl Sync for LimineMemmapResponse {}
unsafe impl Sync for LimineFramebufferResponse {}
unsafe impl Sync for LimineModuleResponse {}
unsafe impl Sync for LimineBootloaderInfoResponse {}
unsafe impl Sync for LimineMemmapRequest {}
unsafe impl Sync for LimineFramebufferRequest {}
unsafe impl Sync for LimineModuleRequest {}
unsafe impl Sync for LimineBootloaderInfoRequest {}
unsafe impl Send for LimineMemmapRequest {}
unsafe impl Send for LimineFramebufferRequest {}
unsafe impl Send for LimineModuleRequest {}
unsafe impl Send for LimineBootloaderInfoRequest {}

#[used]
#[unsafe(link_section = ".limine_requests_start_marker")]
static LIMINE_REQUESTS_START_MARKER: [u64; 1] = [0];

#[used]
#[unsafe(link_section = ".limine_requests")]
static BASE_REVISION: LimineBaseRevision = LimineBaseRevision::new();

#[used]
#[unsafe(link_section = ".limine_requests")]
static MEMMAP_REQUEST: LimineMemmapRequest = LimineMemmapRequest::new();

#[used]
#[unsafe(link_section = ".limine_requests")]
static FRAMEBUFFER_REQUEST: LimineFramebufferRequest = LimineFramebufferRequest::new();

#[used]
#[unsafe(link_section = ".limine_requests")]
static MODULE_REQUEST: LimineModuleRequest = LimineModuleRequest::new();

#[used]
#[unsafe(link_section = ".limine_requests")]
static BOOTLOADER_INFO_REQUEST: LimineBootloaderInfoRequest = LimineBootloaderInfoRequest::new();

#[used]
#[unsafe(link_section = ".limine_requests_end_marker")]
static LIMINE_REQUESTS_END_MARKER: [u64; 1] = [0];

#[derive(Clone, Copy, Debug)]
pub struct MemmapEntry {
    pub base: u64,
    pub length: u64,
    pub typ: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct BootInfo {
    pub framebuffer: Option<FramebufferInfo>,
    pub memmap_entries: u64,
    pub total_memory: u64,
    pub usable_memory: u64,
    pub module_count: u64,
}

struct SystemInfo {
    framebuffer: Option<FramebufferInfo>,
    memmap: Option<&'static LimineMemmapResponse>,
    modules: Option<&'static LimineModuleResponse>,
    total_memory: u64,
    usable_memory: u64,
}

impl SystemInfo {
    const fn new() -> Self {
        Self {
            framebuffer: None,
            memmap: None,
            modules: None,
            total_memory: 0,
            usable_memory: 0,
        }
    }
}

struct SystemInfoCell(UnsafeCell<SystemInfo>);

// Written once from `init` before interrupts exist, read-only after.
unsafe impl Sync for SystemInfoCell {}

static SYSTEM_INFO: SystemInfoCell = SystemInfoCell(UnsafeCell::new(SystemInfo::new()));

fn sysinfo_mut() -> &'static mut SystemInfo {
    unsafe { &mut *SYSTEM_INFO.0.get() }
}

fn sysinfo() -> &'static SystemInfo {
    unsafe { &*SYSTEM_INFO.0.get() }
}

/// Snapshot the bootloader responses. Must run before any other boot
/// protocol accessor, on the boot CPU, with interrupts still disabled.
pub fn init() -> Result<(), LimineError> {
    if !BASE_REVISION.supported() {
        return Err(LimineError::UnsupportedRevision);
    }

    let info = sysinfo_mut();

    unsafe {
        if let Some(resp) = BOOTLOADER_INFO_REQUEST.response.as_ref() {
            if !resp.name.is_null() && !resp.version.is_null() {
                klog_debug!(
                    "limine: booted by {} {}",
                    CStr::from_ptr(resp.name).to_str().unwrap_or("<invalid utf-8>"),
                    CStr::from_ptr(resp.version).to_str().unwrap_or("<invalid utf-8>")
                );
            }
        }
    }

    // A kernel without a memory map has nothing to run on; bail before
    // any other setup commits to the boot.
    unsafe {
        let Some(memmap) = MEMMAP_REQUEST.response.as_ref() else {
            return Err(LimineError::NoMemoryMap);
        };
        if memmap.entry_count == 0 {
            return Err(LimineError::NoMemoryMap);
        }
        let mut total = 0u64;
        let mut usable = 0u64;
        for idx in 0..memmap.entry_count {
            let entry_ptr = *memmap.entries.add(idx as usize);
            if let Some(entry) = entry_ptr.as_ref() {
                total = total.saturating_add(entry.length);
                if entry.typ == LIMINE_MEMMAP_USABLE {
                    usable = usable.saturating_add(entry.length);
                }
            }
        }
        info.memmap = Some(memmap);
        info.total_memory = total;
        info.usable_memory = usable;
        klog_debug!(
            "limine: memmap {} entries, {} MB total, {} MB usable",
            memmap.entry_count,
            total / (1024 * 1024),
            usable / (1024 * 1024)
        );
    }

    unsafe {
        if let Some(fb_resp) = FRAMEBUFFER_REQUEST.response.as_ref() {
            if fb_resp.framebuffer_count > 0 {
                if let Some(fb) = (*fb_resp.framebuffers).as_ref() {
                    info.framebuffer = Some(FramebufferInfo {
                        address: fb.address,
                        width: fb.width,
                        height: fb.height,
                        pitch: fb.pitch,
                        bpp: fb.bpp,
                    });
                    klog_debug!(
                        "limine: framebuffer {}x{} @ {} bpp, pitch {}",
                        fb.width,
                        fb.height,
                        fb.bpp,
                        fb.pitch
                    );
                }
            } else {
                klog_warn!("limine: framebuffer response carries no framebuffers");
            }
        } else {
            klog_warn!("limine: no framebuffer response");
        }
    }

    unsafe {
        if let Some(mods) = MODULE_REQUEST.response.as_ref() {
            info.modules = Some(mods);
            klog_debug!("limine: {} boot modules", mods.module_count);
            for idx in 0..mods.module_count {
                if let Some(file) = (*mods.modules.add(idx as usize)).as_ref() {
                    if !file.path.is_null() {
                        let path = CStr::from_ptr(file.path.cast::<c_char>())
                            .to_str()
                            .unwrap_or("<invalid utf-8>");
                        klog_debug!("limine: module {} = {} ({} bytes)", idx, path, file.size);
                    }
                }
            }
        } else {
            klog_info!("limine: no modules provided");
        }
    }

    Ok(())
}

pub fn boot_info() -> BootInfo {
    let info = sysinfo();
    BootInfo {
        framebuffer: info.framebuffer,
        memmap_entries: info.memmap.map(|m| m.entry_count).unwrap_or(0),
        total_memory: info.total_memory,
        usable_memory: info.usable_memory,
        module_count: info.modules.map(|m| m.module_count).unwrap_or(0),
    }
}

pub fn framebuffer() -> Option<FramebufferInfo> {
    sysinfo().framebuffer
}

pub fn memmap_entry(index: usize) -> Option<MemmapEntry> {
    let memmap = sysinfo().memmap?;
    if index >= memmap.entry_count as usize {
        return None;
    }
    unsafe {
        let entry_ptr = *memmap.entries.add(index);
        entry_ptr.as_ref().map(|entry| MemmapEntry {
            base: entry.base,
            length: entry.length,
            typ: entry.typ,
        })
    }
}

/// Locate a boot module by the trailing part of its path, for example
/// `"font.psf"`. Module data is bootloader-reclaimable but this kernel
/// never releases it, so the `'static` borrow holds.
pub fn module_by_path_suffix(suffix: &str) -> Option<&'static [u8]> {
    let mods = sysinfo().modules?;
    for idx in 0..mods.module_count {
        unsafe {
            let Some(file) = (*mods.modules.add(idx as usize)).as_ref() else {
                continue;
            };
            if file.path.is_null() || file.address.is_null() {
                continue;
            }
            let Ok(path) = CStr::from_ptr(file.path.cast::<c_char>()).to_str() else {
                continue;
            };
            if path.ends_with(suffix) {
                return Some(slice::from_raw_parts(file.address, file.size as usize));
            }
        }
    }
    None
}
