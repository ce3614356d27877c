use windows::Win32::Graphics::Imaging::{CLSID_WICImagingFactory, IWICImagingFactory2};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_INPROC_SERVER};

use crate::error::{RuntimeError, RuntimeResult};

/// Create a WIC imaging factory; COM must be initialized on the calling thread
pub(super) fn create_imaging_factory() -> RuntimeResult<IWICImagingFactory2> {
    unsafe { CoCreateInstance(&CLSID_WICImagingFactory, None, CLSCTX_INPROC_SERVER) }.map_err(|e| {
        RuntimeError::Com {
            context: "CoCreateInstance(CLSID_WICImagingFactory)".into(),
            hresult: e.code().0 as u32,
        }
    })
}
