use crate::error::{ReportError, Result};
use base64::Engine;
use image::GenericImageView;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Font,
    Image,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Font => "font",
            AssetKind::Image => "image",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Asset {
    pub name: String,
    pub kind: AssetKind,
    pub data: Vec<u8>,
    pub source: Option<String>,
}

impl Asset {
    pub fn new(name: impl Into<String>, kind: AssetKind, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            data,
            source: None,
        }
    }

    /// Reads an asset from disk. A missing file is an error for this render
    /// only; nothing is cached across renderers.
    pub fn from_file(name: impl Into<String>, kind: AssetKind, path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|err| {
            ReportError::Asset(format!("{} {}: {err}", kind.as_str(), path.display()))
        })?;
        Ok(Self {
            source: Some(path.display().to_string()),
            ..Self::new(name, kind, data)
        })
    }

    /// Accepts `data:<mime>;base64,<payload>` URIs as well as raw bytes.
    pub fn from_data_uri(name: impl Into<String>, kind: AssetKind, uri: &str) -> Result<Self> {
        let (_, data) = parse_data_uri(uri)
            .ok_or_else(|| ReportError::Asset(format!("malformed data URI for {}", kind.as_str())))?;
        Ok(Self::new(name, kind, data))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    pub assets: Vec<Asset>,
}

impl AssetBundle {
    pub fn add(&mut self, asset: Asset) {
        self.assets.retain(|existing| existing.name != asset.name);
        self.assets.push(asset);
    }

    pub fn image(&self, name: &str) -> Option<&Asset> {
        self.assets
            .iter()
            .find(|asset| asset.kind == AssetKind::Image && asset.name == name)
    }
}

/// A raster ready to be written as an image XObject.
#[derive(Debug, Clone)]
pub(crate) struct ImageData {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) color_space: &'static str,
    pub(crate) bits_per_component: u8,
    pub(crate) filter: &'static str,
    pub(crate) data: Vec<u8>,
    pub(crate) alpha: Option<Vec<u8>>,
}

/// JPEG data passes through untouched (DCT); everything else is decoded to
/// RGB and deflated, with a separate soft mask when any pixel is translucent.
pub(crate) fn decode_image(asset: &Asset) -> Result<ImageData> {
    let format = image::guess_format(&asset.data).ok();
    let decoded = image::load_from_memory(&asset.data)
        .map_err(|err| ReportError::Asset(format!("image {}: {err}", asset.name)))?;
    let (width, height) = decoded.dimensions();

    if matches!(format, Some(image::ImageFormat::Jpeg)) {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "/DeviceGray",
            _ => "/DeviceRGB",
        };
        return Ok(ImageData {
            width,
            height,
            color_space,
            bits_per_component: 8,
            filter: "/DCTDecode",
            data: asset.data.clone(),
            alpha: None,
        });
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    Ok(ImageData {
        width,
        height,
        color_space: "/DeviceRGB",
        bits_per_component: 8,
        filter: "/FlateDecode",
        data: flate_compress(&rgb)?,
        alpha: if has_alpha {
            Some(flate_compress(&alpha)?)
        } else {
            None
        },
    })
}

pub(crate) fn flate_compress(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header
        .split(';')
        .next()
        .filter(|value| !value.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains("base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some((mime, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(alpha: u8) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, alpha]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn opaque_png_is_deflated_without_mask() {
        let asset = Asset::new("logo", AssetKind::Image, png_bytes(255));
        let decoded = decode_image(&asset).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.filter, "/FlateDecode");
        assert!(decoded.alpha.is_none());
    }

    #[test]
    fn translucent_png_carries_a_soft_mask() {
        let asset = Asset::new("logo", AssetKind::Image, png_bytes(128));
        assert!(decode_image(&asset).unwrap().alpha.is_some());
    }

    #[test]
    fn jpeg_passes_through() {
        let image = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut out, image::ImageFormat::Jpeg)
            .unwrap();
        let bytes = out.into_inner();
        let decoded = decode_image(&Asset::new("logo", AssetKind::Image, bytes.clone())).unwrap();
        assert_eq!(decoded.filter, "/DCTDecode");
        assert_eq!(decoded.data, bytes);
    }

    #[test]
    fn garbage_image_is_an_asset_error() {
        let asset = Asset::new("logo", AssetKind::Image, b"not an image".to_vec());
        assert!(matches!(decode_image(&asset), Err(ReportError::Asset(_))));
    }

    #[test]
    fn data_uri_payload_is_base64_decoded() {
        let asset = Asset::from_data_uri("logo", AssetKind::Image, "data:image/png;base64,aGVsbG8=")
            .unwrap();
        assert_eq!(asset.data, b"hello");
        assert!(Asset::from_data_uri("logo", AssetKind::Image, "nope").is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = Asset::from_file("logo", AssetKind::Image, Path::new("/no/such/SavvyLogo.jpg"))
            .unwrap_err();
        assert!(err.to_string().contains("SavvyLogo.jpg"));
    }

    #[test]
    fn adding_an_asset_replaces_one_with_the_same_name() {
        let mut bundle = AssetBundle::default();
        bundle.add(Asset::new("logo", AssetKind::Image, vec![1]));
        bundle.add(Asset::new("logo", AssetKind::Image, vec![2]));
        assert_eq!(bundle.assets.len(), 1);
        assert_eq!(bundle.image("logo").map(|a| a.data.clone()), Some(vec![2]));
    }
}
