//! Loading distance fields stored as VTK XML image data (`.vti`).
//!
//! A single piece is read, taking the first point-data array as the field. Arrays may be stored
//! inline as `ascii` or base64 `binary`, or in an `<AppendedData>` section in either `raw` or
//! `base64` encoding. Binary blocks may be zlib compressed.

use std::{fs, io::Read, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::ZlibDecoder;
use log::{debug, info};
use nalgebra::{Point3, Vector3};

use crate::{grid::Grid, Error, Result};

/// Relative difference tolerated between the spacings of the three axes.
const SPACING_TOLERANCE: f32 = 1e-5;

fn invalid<S: Into<String>>(msg: S) -> Error {
    Error::Vti(msg.into())
}

/// Read a grid from a `.vti` file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let path = path.as_ref();
    info!("reading {}", path.display());
    let data = fs::read(path)?;
    let grid = parse(data)?;
    let [nx, ny, nz] = grid.dims();
    info!("loaded {}x{}x{} grid", nx, ny, nz);
    Ok(grid)
}

/// Parse the contents of a `.vti` file.
pub fn parse<B: AsRef<[u8]>>(data: B) -> Result<Grid> {
    let (markup, appended) = split_appended(data.as_ref())?;
    let mut scanner = Scanner::new(markup);

    let mut layout = Layout::default();
    let mut extent = None;
    let mut origin = Point3::origin();
    let mut spacing = Vector3::repeat(1.0);
    let mut in_point_data = false;
    let mut values = None;

    while let Some(tag) = scanner.next_tag()? {
        match tag.name {
            "VTKFile" => {
                if let Some(ty) = tag.attr("type") {
                    if ty != "ImageData" {
                        return Err(invalid(format!("unsupported dataset type `{}`", ty)));
                    }
                }
                layout = Layout::from_tag(&tag)?;
            }

            "ImageData" => {
                if let Some(text) = tag.attr("WholeExtent") {
                    extent = Some(parse_extent(text)?);
                }
                if let Some(text) = tag.attr("Origin") {
                    origin = Point3::from(parse_triple(text, "Origin")?);
                }
                if let Some(text) = tag.attr("Spacing") {
                    spacing = parse_triple(text, "Spacing")?;
                }
            }

            "Piece" => {
                if extent.is_none() {
                    if let Some(text) = tag.attr("Extent") {
                        extent = Some(parse_extent(text)?);
                    }
                }
            }

            "PointData" => in_point_data = true,

            "CellData" => in_point_data = false,

            "DataArray" if in_point_data && values.is_none() => {
                debug!(
                    "reading point data array {:?} ({})",
                    tag.attr("Name"),
                    tag.attr("format").unwrap_or("ascii")
                );
                values = Some(read_data_array(&tag, scanner.body(), &layout, appended.as_ref())?);
            }

            _ => (),
        }
    }

    let extent = extent.ok_or_else(|| invalid("missing WholeExtent"))?;
    let values = values.ok_or_else(|| invalid("no point data array"))?;

    let voxel_width = uniform_spacing(&spacing)?;
    let dims = [
        (extent[1] - extent[0] + 1) as usize,
        (extent[3] - extent[2] + 1) as usize,
        (extent[5] - extent[4] + 1) as usize,
    ];

    // The extent may start away from zero; the grid origin is the first sample's position.
    let first = Vector3::new(extent[0] as f32, extent[2] as f32, extent[4] as f32);
    let origin = origin + first.component_mul(&spacing);

    Grid::new(dims, origin, voxel_width, values)
}

/// The payload of an `<AppendedData>` section, starting just after its `_` marker.
#[derive(Debug)]
struct Appended<'a> {
    raw: bool,
    data: &'a [u8],
}

/// Split the document into its markup and the appended payload. Raw appended data is not text,
/// so only the part before it has to be valid UTF-8.
fn split_appended(data: &[u8]) -> Result<(&str, Option<Appended<'_>>)> {
    let start = match find(data, b"<AppendedData") {
        Some(ix) => ix,
        None => return Ok((utf8(data)?, None)),
    };

    let close = find(&data[start..], b">")
        .map(|ix| start + ix)
        .ok_or_else(|| invalid("unterminated <AppendedData> tag"))?;
    let tag = parse_tag(utf8(&data[start + 1..close])?.trim_end_matches('/'))?;
    let raw = match tag.attr("encoding").unwrap_or("base64") {
        "raw" => true,
        "base64" => false,
        other => return Err(invalid(format!("unsupported appended encoding `{}`", other))),
    };

    let marker = find(&data[close..], b"_")
        .map(|ix| close + ix)
        .ok_or_else(|| invalid("appended data is missing its `_` marker"))?;

    Ok((
        utf8(&data[..start])?,
        Some(Appended {
            raw,
            data: &data[marker + 1..],
        }),
    ))
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| invalid("markup is not valid UTF-8"))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_extent(text: &str) -> Result<[i64; 6]> {
    let parts = text
        .split_whitespace()
        .map(|p| p.parse::<i64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| invalid(format!("malformed extent `{}`", text)))?;

    let extent: [i64; 6] = parts
        .try_into()
        .map_err(|_| invalid(format!("extent needs six values, got `{}`", text)))?;

    for axis in 0..3 {
        if extent[2 * axis + 1] < extent[2 * axis] {
            return Err(invalid(format!("empty extent `{}`", text)));
        }
    }

    Ok(extent)
}

fn parse_triple(text: &str, what: &str) -> Result<Vector3<f32>> {
    let parts = text
        .split_whitespace()
        .map(|p| p.parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| invalid(format!("malformed {} `{}`", what, text)))?;

    match parts.as_slice() {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => Err(invalid(format!("{} needs three values, got `{}`", what, text))),
    }
}

fn uniform_spacing(spacing: &Vector3<f32>) -> Result<f32> {
    let width = spacing.x;
    let uniform = spacing
        .iter()
        .all(|s| (s - width).abs() <= SPACING_TOLERANCE * width.abs());
    if uniform {
        Ok(width)
    } else {
        Err(invalid(format!(
            "spacing must be uniform, got {} {} {}",
            spacing.x, spacing.y, spacing.z
        )))
    }
}

/// Element types a data array may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl Scalar {
    fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "Int8" => Scalar::Int8,
            "UInt8" => Scalar::UInt8,
            "Int16" => Scalar::Int16,
            "UInt16" => Scalar::UInt16,
            "Int32" => Scalar::Int32,
            "UInt32" => Scalar::UInt32,
            "Int64" => Scalar::Int64,
            "UInt64" => Scalar::UInt64,
            "Float32" => Scalar::Float32,
            "Float64" => Scalar::Float64,
            other => return Err(invalid(format!("unsupported data array type `{}`", other))),
        })
    }

    fn size(self) -> usize {
        match self {
            Scalar::Int8 | Scalar::UInt8 => 1,
            Scalar::Int16 | Scalar::UInt16 => 2,
            Scalar::Int32 | Scalar::UInt32 | Scalar::Float32 => 4,
            Scalar::Int64 | Scalar::UInt64 | Scalar::Float64 => 8,
        }
    }

    /// Read one element. `bytes` must be exactly `self.size()` long.
    fn read(self, bytes: &[u8], big_endian: bool) -> f64 {
        match self {
            Scalar::Int8 => bytes[0] as i8 as f64,
            Scalar::UInt8 => bytes[0] as f64,
            Scalar::Int16 => i16::from_le_bytes(ordered(bytes, big_endian)) as f64,
            Scalar::UInt16 => u16::from_le_bytes(ordered(bytes, big_endian)) as f64,
            Scalar::Int32 => i32::from_le_bytes(ordered(bytes, big_endian)) as f64,
            Scalar::UInt32 => u32::from_le_bytes(ordered(bytes, big_endian)) as f64,
            Scalar::Int64 => i64::from_le_bytes(ordered(bytes, big_endian)) as f64,
            Scalar::UInt64 => u64::from_le_bytes(ordered(bytes, big_endian)) as f64,
            Scalar::Float32 => f32::from_le_bytes(ordered(bytes, big_endian)) as f64,
            Scalar::Float64 => f64::from_le_bytes(ordered(bytes, big_endian)),
        }
    }

    fn decode(self, bytes: &[u8], big_endian: bool) -> Result<Vec<f32>> {
        let size = self.size();
        if bytes.len() % size != 0 {
            return Err(invalid(format!(
                "{} bytes do not divide into {:?} values",
                bytes.len(),
                self
            )));
        }

        Ok(bytes
            .chunks_exact(size)
            .map(|c| self.read(c, big_endian) as f32)
            .collect())
    }
}

/// Copy an element into little-endian order.
fn ordered<const N: usize>(bytes: &[u8], big_endian: bool) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(bytes);
    if big_endian {
        buf.reverse();
    }
    buf
}

/// How binary blocks are framed, as declared on the `<VTKFile>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    big_endian: bool,

    /// Type of the size words that precede each block.
    header: Scalar,

    /// Blocks are zlib streams.
    compressed: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            big_endian: false,
            header: Scalar::UInt32,
            compressed: false,
        }
    }
}

impl Layout {
    fn from_tag(tag: &Tag) -> Result<Self> {
        let big_endian = match tag.attr("byte_order").unwrap_or("LittleEndian") {
            "LittleEndian" => false,
            "BigEndian" => true,
            other => return Err(invalid(format!("unknown byte order `{}`", other))),
        };

        let header = match tag.attr("header_type").unwrap_or("UInt32") {
            "UInt32" => Scalar::UInt32,
            "UInt64" => Scalar::UInt64,
            other => return Err(invalid(format!("unsupported header type `{}`", other))),
        };

        let compressed = match tag.attr("compressor") {
            None | Some("") => false,
            Some("vtkZLibDataCompressor") => true,
            Some(other) => return Err(invalid(format!("unsupported compressor `{}`", other))),
        };

        Ok(Self {
            big_endian,
            header,
            compressed,
        })
    }

    /// Read the first `count` size words from the front of `bytes`.
    fn words(&self, bytes: &[u8], count: usize) -> Result<Vec<usize>> {
        let size = self.header.size();
        let len = count
            .checked_mul(size)
            .ok_or_else(|| invalid("block header is too large"))?;
        Ok(take(bytes, 0, len)?
            .chunks_exact(size)
            .map(|c| self.header.read(c, self.big_endian) as usize)
            .collect())
    }

    /// Size in bytes of a compressed block's header, which holds `blocks` sizes after three
    /// leading words.
    fn compressed_header_len(&self, blocks: usize) -> Result<usize> {
        blocks
            .checked_add(3)
            .and_then(|n| n.checked_mul(self.header.size()))
            .ok_or_else(|| invalid("block header is too large"))
    }
}

fn take(bytes: &[u8], start: usize, len: usize) -> Result<&[u8]> {
    start
        .checked_add(len)
        .and_then(|end| bytes.get(start..end))
        .ok_or_else(|| invalid("binary data is truncated"))
}

fn read_data_array(
    tag: &Tag,
    body: &str,
    layout: &Layout,
    appended: Option<&Appended>,
) -> Result<Vec<f32>> {
    match tag.attr("NumberOfComponents") {
        None | Some("1") => (),
        Some(n) => return Err(invalid(format!("expected a scalar array, got {} components", n))),
    }

    let ty = Scalar::parse(tag.attr("type").unwrap_or("Float32"))?;

    let bytes = match tag.attr("format").unwrap_or("ascii") {
        "ascii" => return parse_ascii(body),

        "binary" => read_base64(body.as_bytes(), layout)?,

        "appended" => {
            let appended = appended
                .ok_or_else(|| invalid("appended data array without an <AppendedData> section"))?;
            let offset = tag
                .attr("offset")
                .and_then(|o| o.trim().parse::<usize>().ok())
                .ok_or_else(|| invalid("appended data array needs a numeric offset"))?;
            let data = appended
                .data
                .get(offset..)
                .ok_or_else(|| invalid(format!("offset {} is past the appended data", offset)))?;

            if appended.raw {
                read_raw(data, layout)?
            } else {
                read_base64(data, layout)?
            }
        }

        other => return Err(invalid(format!("unsupported data array format `{}`", other))),
    };

    ty.decode(&bytes, layout.big_endian)
}

fn parse_ascii(body: &str) -> Result<Vec<f32>> {
    body.split_whitespace()
        .map(|v| {
            v.parse::<f32>()
                .map_err(|_| invalid(format!("malformed value `{}`", v)))
        })
        .collect()
}

/// Unpack a block stored as bytes: a size header followed by the data.
fn read_raw(data: &[u8], layout: &Layout) -> Result<Vec<u8>> {
    let first = layout.words(data, 1)?[0];

    if !layout.compressed {
        return Ok(take(data, layout.header.size(), first)?.to_vec());
    }

    let header_len = layout.compressed_header_len(first)?;
    let header = layout.words(data, first + 3)?;
    let total = compressed_len(&header)?;
    inflate(&header, take(data, header_len, total)?)
}

/// Unpack a base64 block. Uncompressed blocks encode header and data as one stream, while
/// compressed blocks encode the header and the data separately.
fn read_base64(data: &[u8], layout: &Layout) -> Result<Vec<u8>> {
    let end = data.iter().position(|&b| b == b'<').unwrap_or(data.len());
    let text: Vec<u8> = data[..end]
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    let size = layout.header.size();
    let first = layout.words(&decode_prefix(&text, size)?, 1)?[0];

    if !layout.compressed {
        let total = size
            .checked_add(first)
            .ok_or_else(|| invalid("block is too large"))?;
        return Ok(take(&decode_prefix(&text, total)?, size, first)?.to_vec());
    }

    let header_len = layout.compressed_header_len(first)?;
    let header = layout.words(&decode_prefix(&text, header_len)?, first + 3)?;
    let rest = text
        .get(encoded_len(header_len)..)
        .ok_or_else(|| invalid("binary data is truncated"))?;
    let total = compressed_len(&header)?;
    inflate(&header, take(&decode_prefix(rest, total)?, 0, total)?)
}

/// Number of base64 characters that encode `n` bytes.
fn encoded_len(n: usize) -> usize {
    n.div_ceil(3).saturating_mul(4)
}

/// Decode just enough of `text` to cover its first `n` bytes.
fn decode_prefix(text: &[u8], n: usize) -> Result<Vec<u8>> {
    let chunk = text
        .get(..encoded_len(n))
        .ok_or_else(|| invalid("binary data is truncated"))?;
    STANDARD
        .decode(chunk)
        .map_err(|err| invalid(format!("malformed base64 data: {}", err)))
}

fn compressed_len(header: &[usize]) -> Result<usize> {
    header[3..]
        .iter()
        .try_fold(0usize, |acc, &n| acc.checked_add(n))
        .ok_or_else(|| invalid("block is too large"))
}

/// Decompress the blocks described by a compressed header: `[blocks, block size, last block size,
/// compressed sizes...]`. A last block size of zero means the last block is full.
fn inflate(header: &[usize], mut data: &[u8]) -> Result<Vec<u8>> {
    let (blocks, block_size, last_size) = (header[0], header[1], header[2]);

    let mut out = Vec::new();
    for (i, &len) in header[3..].iter().enumerate() {
        let (block, rest) = data.split_at(len);
        data = rest;

        let expected = if i + 1 == blocks && last_size != 0 {
            last_size
        } else {
            block_size
        };

        let before = out.len();
        ZlibDecoder::new(block)
            .read_to_end(&mut out)
            .map_err(|err| invalid(format!("corrupt compressed block: {}", err)))?;
        if out.len() - before != expected {
            return Err(invalid(format!(
                "compressed block {} inflated to {} bytes, expected {}",
                i,
                out.len() - before,
                expected
            )));
        }
    }

    Ok(out)
}

/// An opening tag.
#[derive(Debug)]
struct Tag<'a> {
    name: &'a str,
    attrs: Vec<(&'a str, &'a str)>,
}

impl<'a> Tag<'a> {
    fn attr(&self, key: &str) -> Option<&'a str> {
        self.attrs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }
}

/// Walks the opening tags of an XML document, skipping closing tags, comments and declarations.
struct Scanner<'a> {
    buf: &'a str,
    offset: usize,
}

impl<'a> Scanner<'a> {
    fn new(buf: &'a str) -> Self {
        Self { buf, offset: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.buf[self.offset..]
    }

    /// The text between the end of the last tag and the start of the next one.
    fn body(&self) -> &'a str {
        let rest = self.rest();
        &rest[..rest.find('<').unwrap_or(rest.len())]
    }

    fn skip_past(&mut self, pat: &str) -> Result<()> {
        match self.rest().find(pat) {
            Some(ix) => {
                self.offset += ix + pat.len();
                Ok(())
            }
            None => Err(invalid(format!("unterminated markup, expected `{}`", pat))),
        }
    }

    fn next_tag(&mut self) -> Result<Option<Tag<'a>>> {
        loop {
            match self.rest().find('<') {
                Some(ix) => self.offset += ix,
                None => return Ok(None),
            }

            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if rest.starts_with("<?") {
                self.skip_past("?>")?;
            } else if rest.starts_with("</") || rest.starts_with("<!") {
                self.skip_past(">")?;
            } else {
                let start = self.offset + 1;
                self.skip_past(">")?;
                let inner = self.buf[start..self.offset - 1].trim_end_matches('/');
                return parse_tag(inner).map(Some);
            }
        }
    }
}

fn parse_tag(inner: &str) -> Result<Tag<'_>> {
    let inner = inner.trim();
    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    let name = &inner[..name_end];
    if name.is_empty() {
        return Err(invalid("empty tag"));
    }

    let mut attrs = Vec::new();
    let mut rest = inner[name_end..].trim_start();
    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| invalid(format!("malformed attributes in <{}>", name)))?;
        let key = rest[..eq].trim();
        let after = rest[eq + 1..].trim_start();

        let quote = after
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| invalid(format!("unquoted attribute `{}` in <{}>", key, name)))?;
        let close = after[1..]
            .find(quote)
            .ok_or_else(|| invalid(format!("unterminated attribute `{}` in <{}>", key, name)))?;

        attrs.push((key, &after[1..1 + close]));
        rest = after[close + 2..].trim_start();
    }

    Ok(Tag { name, attrs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use flate2::{write::ZlibEncoder, Compression};
    use std::io::Write;

    const SMALL: &str = r#"<?xml version="1.0"?>
<VTKFile type="ImageData" version="0.1" byte_order="LittleEndian">
  <!-- written by hand -->
  <ImageData WholeExtent="0 2 0 1 0 1" Origin="-1 0 2.5" Spacing="0.5 0.5 0.5">
    <Piece Extent="0 2 0 1 0 1">
      <PointData Scalars="distance">
        <DataArray type="Float32" Name="distance" format="ascii">
          0 1 2
          3 4 5
          6 7 8
          9 10 11
        </DataArray>
      </PointData>
      <CellData>
        <DataArray type="Float32" Name="ignored" format="ascii">42</DataArray>
      </CellData>
    </Piece>
  </ImageData>
</VTKFile>
"#;

    #[test]
    fn test_parse() {
        let grid = parse(SMALL).unwrap();
        assert_eq!([3, 2, 2], grid.dims());
        assert_eq!(&Point3::new(-1., 0., 2.5), grid.origin());
        assert_eq!(0.5, grid.voxel_width());
        assert_eq!(1.0, grid.value(1, 0, 0));
        assert_eq!(3.0, grid.value(0, 1, 0));
        assert_eq!(11.0, grid.value(2, 1, 1));
    }

    #[test]
    fn test_extent_offset_moves_origin() {
        let text = SMALL
            .replace("WholeExtent=\"0 2 0 1 0 1\"", "WholeExtent=\"2 4 0 1 -2 -1\"")
            .replace("Origin=\"-1 0 2.5\"", "Origin=\"0 0 0\"");
        let grid = parse(&text).unwrap();
        assert_eq!([3, 2, 2], grid.dims());
        assert_eq!(&Point3::new(1., 0., -1.), grid.origin());
    }

    #[test]
    fn test_piece_extent_fallback() {
        let text = SMALL.replace(" WholeExtent=\"0 2 0 1 0 1\"", "");
        assert_eq!([3, 2, 2], parse(&text).unwrap().dims());
    }

    #[test]
    fn test_errors() {
        let hex = SMALL.replace("format=\"ascii\">\n", "format=\"hex\">\n");
        assert!(matches!(parse(&hex), Err(Error::Vti(_))));

        let skewed = SMALL.replace("Spacing=\"0.5 0.5 0.5\"", "Spacing=\"0.5 1 0.5\"");
        assert!(matches!(parse(&skewed), Err(Error::Vti(_))));

        let short = SMALL.replace("9 10 11", "9 10");
        assert!(matches!(
            parse(&short),
            Err(Error::GridSize {
                expected: 12,
                actual: 11
            })
        ));

        let garbage = SMALL.replace("9 10 11", "9 ten 11");
        assert!(matches!(parse(&garbage), Err(Error::Vti(_))));

        let poly = SMALL.replace("type=\"ImageData\"", "type=\"PolyData\"");
        assert!(matches!(parse(&poly), Err(Error::Vti(_))));

        assert!(matches!(parse("<VTKFile"), Err(Error::Vti(_))));
    }

    #[test]
    fn test_parse_tag() {
        let tag = parse_tag(r#"DataArray type='Float32' Name = "a b" "#).unwrap();
        assert_eq!("DataArray", tag.name);
        assert_eq!(Some("Float32"), tag.attr("type"));
        assert_eq!(Some("a b"), tag.attr("Name"));
        assert_eq!(None, tag.attr("format"));
    }

    const FIELD: [f32; 4] = [1.5, -2.0, 0.25, 8.0];

    /// A 2x2x1 image whose only point data array carries `array_attrs` and `body`.
    fn document(file_attrs: &str, array_attrs: &str, body: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<VTKFile type="ImageData" version="1.0" {}>
  <ImageData WholeExtent="0 1 0 1 0 0" Origin="0 0 0" Spacing="1 1 1">
    <Piece Extent="0 1 0 1 0 0">
      <PointData Scalars="sdf">
        <DataArray type="Float32" Name="sdf" {}>{}</DataArray>
      </PointData>
    </Piece>
  </ImageData>
"#,
            file_attrs, array_attrs, body
        )
    }

    fn with_appended(mut doc: String, encoding: &str, payload: &[u8]) -> Vec<u8> {
        doc.push_str(&format!("  <AppendedData encoding=\"{}\">\n   _", encoding));
        let mut bytes = doc.into_bytes();
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(b"\n  </AppendedData>\n</VTKFile>\n");
        bytes
    }

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// An uncompressed block: its length as a `UInt32`, then the data.
    fn block(data: &[u8]) -> Vec<u8> {
        let mut out = (data.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(data);
        out
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn assert_field(grid: &Grid) {
        assert_eq!([2, 2, 1], grid.dims());
        assert_eq!(FIELD.to_vec(), grid.values());
    }

    #[test]
    fn test_binary_inline() {
        // Length 8, then 1.5 and -2.0.
        let doc = document("", "format=\"binary\"", "CAAAAAAAwD8AAADA")
            .replace("WholeExtent=\"0 1 0 1 0 0\"", "WholeExtent=\"0 1 0 0 0 0\"");
        let grid = parse(doc + "</VTKFile>\n").unwrap();
        assert_eq!([2, 1, 1], grid.dims());
        assert_eq!(vec![1.5f32, -2.0], grid.values());

        let body = format!("\n          {}\n        ", STANDARD.encode(block(&floats(&FIELD))));
        let doc = document("byte_order=\"LittleEndian\"", "format=\"binary\"", &body);
        assert_field(&parse(doc + "</VTKFile>\n").unwrap());
    }

    #[test]
    fn test_binary_big_endian() {
        let mut data = 16u32.to_be_bytes().to_vec();
        data.extend(FIELD.iter().flat_map(|v| v.to_be_bytes()));
        let doc = document(
            "byte_order=\"BigEndian\"",
            "format=\"binary\"",
            &STANDARD.encode(data),
        );
        assert_field(&parse(doc + "</VTKFile>\n").unwrap());
    }

    #[test]
    fn test_appended_raw() {
        // A cell data array sits first in the payload, so the field starts at an offset.
        let doc = document("", "format=\"appended\" offset=\"12\"", "").replace(
            "    </Piece>",
            "      <CellData>\n        \
             <DataArray type=\"Float32\" Name=\"c\" format=\"appended\" offset=\"0\"/>\n      \
             </CellData>\n    </Piece>",
        );
        let mut payload = block(&floats(&[42.0, 43.0]));
        payload.extend(block(&floats(&FIELD)));

        assert_field(&parse(with_appended(doc, "raw", &payload)).unwrap());
    }

    #[test]
    fn test_appended_compressed() {
        // Two full eight byte blocks, each compressed on its own.
        let data = floats(&FIELD);
        let (first, second) = (zlib(&data[..8]), zlib(&data[8..]));
        let header: Vec<u8> = [2u64, 8, 0, first.len() as u64, second.len() as u64]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect();
        let compressed = [first, second].concat();
        let file_attrs = "header_type=\"UInt64\" compressor=\"vtkZLibDataCompressor\"";

        let raw = [header.clone(), compressed.clone()].concat();
        let doc = document(file_attrs, "format=\"appended\" offset=\"0\"", "");
        assert_field(&parse(with_appended(doc, "raw", &raw)).unwrap());

        // In base64 the header and the blocks are encoded separately.
        let filler = STANDARD.encode(block(&floats(&[7.0])));
        let payload = format!(
            "{}{}{}",
            filler,
            STANDARD.encode(&header),
            STANDARD.encode(&compressed)
        );
        let doc = document(
            file_attrs,
            &format!("format=\"appended\" offset=\"{}\"", filler.len()),
            "",
        );
        assert_field(&parse(with_appended(doc, "base64", payload.as_bytes())).unwrap());

        let corrupt = [header, vec![0; compressed.len()]].concat();
        let doc = document(file_attrs, "format=\"appended\" offset=\"0\"", "");
        assert!(matches!(parse(with_appended(doc, "raw", &corrupt)), Err(Error::Vti(_))));
    }

    #[test]
    fn test_binary_errors() {
        let truncated = STANDARD.encode(&block(&floats(&FIELD))[..12]);
        let doc = document("", "format=\"binary\"", &truncated);
        assert!(matches!(parse(doc + "</VTKFile>\n"), Err(Error::Vti(_))));

        let doc = document("", "format=\"appended\" offset=\"0\"", "");
        assert!(matches!(parse(doc + "</VTKFile>\n"), Err(Error::Vti(_))));

        let doc = document("", "format=\"appended\" offset=\"999\"", "");
        let payload = block(&floats(&FIELD));
        assert!(matches!(parse(with_appended(doc, "raw", &payload)), Err(Error::Vti(_))));

        let doc = document("compressor=\"vtkLZ4DataCompressor\"", "format=\"binary\"", "");
        assert!(matches!(parse(doc + "</VTKFile>\n"), Err(Error::Vti(_))));

        let body = STANDARD.encode(block(&floats(&FIELD[..3])));
        let doc = document("", "format=\"binary\"", &body);
        assert!(matches!(
            parse(doc + "</VTKFile>\n"),
            Err(Error::GridSize {
                expected: 4,
                actual: 3
            })
        ));
    }
}
