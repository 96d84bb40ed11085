use crate::error::ChartError;
use cairo::{Format, ImageSurface};
use palette::Srgba;
use std::path::Path;

/// A detached ARGB32 pixel buffer. Cairo surfaces are confined to the thread
/// that created them; rasters are plain bytes and can cross threads.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    width: i32,
    height: i32,
    stride: i32,
    data: Vec<u8>,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .finish_non_exhaustive()
    }
}

impl Raster {
    pub fn transparent(width: i32, height: i32) -> Result<Self, ChartError> {
        let stride = Format::ARgb32.stride_for_width(width.max(0) as u32)?;
        Ok(Self {
            width,
            height,
            stride,
            data: vec![0; (stride * height.max(0)) as usize],
        })
    }

    pub fn from_surface(surface: &ImageSurface) -> Result<Self, ChartError> {
        let mut data = Vec::new();
        surface.with_data(|bytes| data.extend_from_slice(bytes))?;
        Ok(Self {
            width: surface.width(),
            height: surface.height(),
            stride: surface.stride(),
            data,
        })
    }

    pub fn to_surface(&self) -> Result<ImageSurface, ChartError> {
        Ok(ImageSurface::create_for_data(
            self.data.clone(),
            Format::ARgb32,
            self.width,
            self.height,
            self.stride,
        )?)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Premultiplied pixel at `(x, y)`, `None` outside the raster.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Srgba<u8>> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y * self.stride + x * 4) as usize;
        let bytes: [u8; 4] = self.data.get(offset..offset + 4)?.try_into().ok()?;
        let argb = u32::from_ne_bytes(bytes);
        Some(Srgba::new(
            (argb >> 16) as u8,
            (argb >> 8) as u8,
            argb as u8,
            (argb >> 24) as u8,
        ))
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    pub fn write_png(&self, path: impl AsRef<Path>) -> Result<(), ChartError> {
        let surface = self.to_surface()?;
        let mut file = fs_err::File::create(path.as_ref())?;
        surface.write_to_png(&mut file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairo::Context;

    #[test]
    fn test_transparent_is_blank() {
        let raster = Raster::transparent(8, 4).unwrap();
        assert!(raster.is_blank());
        assert_eq!(raster.pixel(7, 3), Some(Srgba::new(0, 0, 0, 0)));
        assert_eq!(raster.pixel(8, 0), None);
        assert_eq!(raster.pixel(0, -1), None);
    }

    #[test]
    fn test_reads_back_painted_pixels() {
        let surface = ImageSurface::create(Format::ARgb32, 10, 10).unwrap();
        {
            let cr = Context::new(&surface).unwrap();
            cr.set_source_rgb(1.0, 0.0, 0.0);
            cr.rectangle(0.0, 0.0, 5.0, 10.0);
            cr.fill().unwrap();
        }

        let raster = Raster::from_surface(&surface).unwrap();
        assert_eq!(raster.pixel(2, 2), Some(Srgba::new(255, 0, 0, 255)));
        assert_eq!(raster.pixel(7, 2), Some(Srgba::new(0, 0, 0, 0)));
        assert!(!raster.is_blank());

        let copy = Raster::from_surface(&raster.to_surface().unwrap()).unwrap();
        assert_eq!(copy.pixel(2, 2), raster.pixel(2, 2));
    }
}
