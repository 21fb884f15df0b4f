//! PDF Document wrapper

use crate::font::{is_win_ansi_encodable, BuiltinFont};
use crate::graphics::{
    generate_circle_operators, generate_line_operators, generate_rect_operators,
    generate_rounded_rect_operators, Corners, ShapeStyle,
};
use crate::image::{deflate, generate_image_operators, place_in_box, ImageFit, ImageXObject};
use crate::text::{generate_text_operators, TextRenderContext};
use crate::{num, Align, PdfError, Result};
use image::RgbaImage;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Parse `#rrggbb` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::from_rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Channels as 0-255 bytes
    pub fn to_rgb8(self) -> [u8; 3] {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [byte(self.r), byte(self.g), byte(self.b)]
    }

    /// `#rrggbb` form, as used by CSS and SVG
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// White color
    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    /// Blue color
    pub fn blue() -> Self {
        Self::rgb(0.0, 0.0, 1.0)
    }

    /// Uniform gray (0.0 black - 1.0 white)
    pub fn gray(level: f32) -> Self {
        Self::rgb(level, level, level)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// ISO A4 portrait
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

/// Where new content goes relative to what the page already shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layer {
    /// Painted before the existing page content (under it)
    Background,
    /// Painted after the existing page content (over it)
    #[default]
    Foreground,
}

/// Placement options for images
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImageOptions {
    pub fit: ImageFit,
    /// Constant paint opacity (0.0 - 1.0), `None` for opaque
    pub opacity: Option<f32>,
    pub layer: Layer,
}

impl ImageOptions {
    /// Aspect-preserving fit, centered in the target box
    pub fn fit_box() -> Self {
        Self {
            fit: ImageFit::Contain,
            ..Self::default()
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }
}

/// Visible page area
///
/// `width` and `height` are as displayed, so they are swapped for pages
/// with a quarter-turn `/Rotate`.
#[derive(Debug, Clone, Copy)]
struct PageBox {
    x0: f64,
    y0: f64,
    width: f64,
    height: f64,
    /// Clockwise display rotation: 0, 90, 180 or 270
    rotation: u16,
}

impl PageBox {
    /// Top-left page coordinates to the drawing frame
    ///
    /// Unrotated pages draw straight into user space. On rotated pages the
    /// frame is upright with its origin at the visible bottom-left corner;
    /// [`Self::upright_matrix`] maps it onto user space.
    fn to_pdf(self, x: f64, y: f64) -> (f64, f64) {
        if self.rotation == 0 {
            (self.x0 + x, self.y0 + self.height - y)
        } else {
            (x, self.height - y)
        }
    }

    /// `cm` operands placing the upright frame on a rotated page
    fn upright_matrix(self) -> Option<[f64; 6]> {
        // Unrotated MediaBox extent
        let (w, h) = match self.rotation {
            90 | 270 => (self.height, self.width),
            _ => (self.width, self.height),
        };
        let (x0, y0) = (self.x0, self.y0);
        match self.rotation {
            90 => Some([0.0, 1.0, -1.0, 0.0, x0 + w, y0]),
            180 => Some([-1.0, 0.0, 0.0, -1.0, x0 + w, y0 + h]),
            270 => Some([0.0, -1.0, 1.0, 0.0, x0, y0 + h]),
            _ => None,
        }
    }
}

/// Normalize a `/Rotate` value to 0, 90, 180 or 270
fn normalize_rotation(degrees: i64) -> u16 {
    match degrees.rem_euclid(360) {
        90 => 90,
        180 => 180,
        270 => 270,
        0 => 0,
        other => {
            log::warn!("ignoring /Rotate {other} (not a multiple of 90)");
            0
        }
    }
}

/// PDF Document wrapper providing page canvas operations
///
/// Every drawing call is buffered per page in call order and written on
/// save. Resource names use an `Xp` prefix so they never collide with the
/// names an existing document already uses.
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// File the document was loaded from, never written back to
    source_path: Option<PathBuf>,
    /// Current font
    current_font: BuiltinFont,
    /// Current font size
    current_font_size: f32,
    /// Current text color
    current_text_color: Color,
    /// Font dictionaries (font -> PDF object ID)
    embedded_fonts: HashMap<BuiltinFont, ObjectId>,
    /// Embedded images (data hash -> object ID, pixel width, pixel height)
    embedded_images: HashMap<u64, (ObjectId, u32, u32)>,
    /// Opacity graphics states (opacity in 1/1000 -> object ID)
    embedded_gstates: HashMap<u32, ObjectId>,
    /// Page resources (page number -> object ID -> resource name)
    page_resources: HashMap<usize, HashMap<ObjectId, String>>,
    /// Next resource number
    next_resource: u32,
    /// Buffered operators drawn over existing content
    page_content_buffer: HashMap<usize, Vec<u8>>,
    /// Buffered operators drawn under existing content
    page_background_buffer: HashMap<usize, Vec<u8>>,
}

impl PdfDocument {
    fn from_document(inner: Document, source_path: Option<PathBuf>) -> Self {
        Self {
            inner,
            source_path,
            current_font: BuiltinFont::default(),
            current_font_size: 12.0,
            current_text_color: Color::default(),
            embedded_fonts: HashMap::new(),
            embedded_images: HashMap::new(),
            embedded_gstates: HashMap::new(),
            page_resources: HashMap::new(),
            next_resource: 1,
            page_content_buffer: HashMap::new(),
            page_background_buffer: HashMap::new(),
        }
    }

    /// Open a PDF document from a file path
    ///
    /// # Example
    /// ```ignore
    /// let doc = PdfDocument::open("paper.pdf")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let inner = Document::load(path).map_err(|e| PdfError::OpenError(e.to_string()))?;
        let source = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Ok(Self::from_document(inner, Some(source)))
    }

    /// Open a PDF document from bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_document(inner, None))
    }

    /// Create a new document with `page_count` blank pages
    ///
    /// # Example
    /// ```ignore
    /// let mut doc = PdfDocument::create(2, PageSize::A4)?;
    /// assert_eq!(doc.page_count(), 2);
    /// ```
    pub fn create(page_count: usize, size: PageSize) -> Result<Self> {
        let mut inner = Document::with_version("1.5");
        let pages_id = inner.new_object_id();

        let mut kids = Vec::with_capacity(page_count);
        for _ in 0..page_count {
            let contents_id = inner.add_object(Stream::new(Dictionary::new(), Vec::new()));
            let page_id = inner.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), size.width.into(), size.height.into()],
                "Resources" => Dictionary::new(),
                "Contents" => contents_id,
            });
            kids.push(Object::Reference(page_id));
        }

        inner.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
            }),
        );

        let catalog_id = inner.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        inner.trailer.set("Root", catalog_id);

        let created = chrono::Local::now().format("D:%Y%m%d%H%M%S").to_string();
        let info_id = inner.add_object(dictionary! {
            "Producer" => Object::string_literal("exam-press"),
            "CreationDate" => Object::string_literal(created),
        });
        inner.trailer.set("Info", info_id);

        Ok(Self::from_document(inner, None))
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Page width and height in points
    pub fn page_size(&self, page: usize) -> Result<PageSize> {
        let page_box = self.page_box(page)?;
        Ok(PageSize {
            width: page_box.width,
            height: page_box.height,
        })
    }

    /// Set the font used by subsequent `insert_text` calls
    pub fn set_font(&mut self, font: BuiltinFont, size: f32) {
        self.current_font = font;
        self.current_font_size = size;
    }

    /// Set text color for subsequent text insertions
    ///
    /// # Example
    /// ```ignore
    /// doc.set_text_color(Color::blue());
    /// doc.set_text_color(Color::from_rgb(21, 76, 121));
    /// ```
    pub fn set_text_color(&mut self, color: Color) {
        self.current_text_color = color;
    }

    /// Width of `text` in points with the current font and size
    pub fn get_text_width(&self, text: &str) -> f64 {
        self.current_font
            .text_width(text, self.current_font_size as f64)
    }

    /// Insert text at a specific position
    ///
    /// Characters outside WinAnsi cannot be shown by the built-in fonts and
    /// are replaced with `?`.
    ///
    /// # Arguments
    /// * `text` - Text to insert
    /// * `page` - Page number (1-indexed)
    /// * `x` - X anchor in points
    /// * `y` - Baseline Y in points (from top)
    /// * `align` - Text alignment relative to `x`
    pub fn insert_text(
        &mut self,
        text: &str,
        page: usize,
        x: f64,
        y: f64,
        align: Align,
    ) -> Result<()> {
        let page_box = self.page_box(page)?;

        if text.is_empty() {
            return Ok(());
        }
        if !is_win_ansi_encodable(text) {
            log::warn!("built-in font cannot show all of {text:?}; unsupported characters replaced");
        }

        let font_name = self.get_or_create_font_ref(self.current_font, page)?;
        let (pdf_x, pdf_y) = page_box.to_pdf(x, y);

        let ctx = TextRenderContext {
            font_name,
            font_size: self.current_font_size,
            text_width: self.get_text_width(text),
            color: self.current_text_color,
        };
        let operators = generate_text_operators(text, pdf_x, pdf_y, align, &ctx);
        self.buffer_content(page, Layer::Foreground, &operators);

        Ok(())
    }

    /// Draw a rectangle whose top-left corner is at (x, y)
    pub fn draw_rect(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        style: &ShapeStyle,
    ) -> Result<()> {
        let page_box = self.page_box(page)?;
        let gstate = self.opacity_ref(page, style.opacity)?;
        let (pdf_x, pdf_y) = page_box.to_pdf(x, y + height);
        let operators =
            generate_rect_operators(pdf_x, pdf_y, width, height, style, gstate.as_deref());
        self.buffer_content(page, Layer::Foreground, &operators);
        Ok(())
    }

    /// Draw a rounded rectangle whose top-left corner is at (x, y)
    #[allow(clippy::too_many_arguments)]
    pub fn draw_rounded_rect(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radius: f64,
        corners: Corners,
        style: &ShapeStyle,
    ) -> Result<()> {
        let page_box = self.page_box(page)?;
        let gstate = self.opacity_ref(page, style.opacity)?;
        let (pdf_x, pdf_y) = page_box.to_pdf(x, y + height);
        let operators = generate_rounded_rect_operators(
            pdf_x,
            pdf_y,
            width,
            height,
            radius,
            corners,
            style,
            gstate.as_deref(),
        );
        self.buffer_content(page, Layer::Foreground, &operators);
        Ok(())
    }

    /// Draw a circle centered at (cx, cy)
    pub fn draw_circle(
        &mut self,
        page: usize,
        cx: f64,
        cy: f64,
        radius: f64,
        style: &ShapeStyle,
    ) -> Result<()> {
        let page_box = self.page_box(page)?;
        let gstate = self.opacity_ref(page, style.opacity)?;
        let (pdf_x, pdf_y) = page_box.to_pdf(cx, cy);
        let operators = generate_circle_operators(pdf_x, pdf_y, radius, style, gstate.as_deref());
        self.buffer_content(page, Layer::Foreground, &operators);
        Ok(())
    }

    /// Draw a straight line from (x1, y1) to (x2, y2)
    #[allow(clippy::too_many_arguments)]
    pub fn draw_line(
        &mut self,
        page: usize,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: Color,
        line_width: f64,
    ) -> Result<()> {
        let page_box = self.page_box(page)?;
        let (ax, ay) = page_box.to_pdf(x1, y1);
        let (bx, by) = page_box.to_pdf(x2, y2);
        let operators = generate_line_operators(ax, ay, bx, by, color, line_width, None);
        self.buffer_content(page, Layer::Foreground, &operators);
        Ok(())
    }

    /// Insert an image stretched to the given box
    ///
    /// # Arguments
    /// * `data` - Image file bytes (JPEG or PNG)
    /// * `page` - Page number (1-indexed)
    /// * `x` - X coordinate in points
    /// * `y` - Y coordinate in points (from top)
    /// * `width` - Image width in points
    /// * `height` - Image height in points
    pub fn insert_image(
        &mut self,
        data: &[u8],
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        self.insert_image_with(data, page, x, y, width, height, &ImageOptions::default())
    }

    /// Insert an encoded image with scaling, opacity and layer options
    #[allow(clippy::too_many_arguments)]
    pub fn insert_image_with(
        &mut self,
        data: &[u8],
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        options: &ImageOptions,
    ) -> Result<()> {
        self.page_box(page)?;
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let image = self.get_or_create_image(hasher.finish(), || {
            ImageXObject::from_encoded(data).map_err(|e| {
                PdfError::ImageError(format!("Failed to create image XObject: {e}"))
            })
        })?;
        self.place_image(page, image, x, y, width, height, options)
    }

    /// Insert an RGBA bitmap, keeping its alpha channel as a soft mask
    #[allow(clippy::too_many_arguments)]
    pub fn insert_rgba_image(
        &mut self,
        image: &RgbaImage,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        options: &ImageOptions,
    ) -> Result<()> {
        self.page_box(page)?;
        let mut hasher = DefaultHasher::new();
        image.width().hash(&mut hasher);
        image.height().hash(&mut hasher);
        image.as_raw().hash(&mut hasher);
        let embedded = self.get_or_create_image(hasher.finish(), || ImageXObject::from_rgba(image))?;
        self.place_image(page, embedded, x, y, width, height, options)
    }

    /// Save the document to a new file
    ///
    /// The file a document was opened from is never overwritten. The bytes
    /// go to a temporary file next to `path` that is renamed into place once
    /// complete, so a failed save leaves no partial output.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let (Some(source), Ok(target)) = (&self.source_path, path.canonicalize()) {
            if *source == target {
                return Err(PdfError::SourceOverwrite(path.display().to_string()));
            }
        }

        let bytes = self.to_bytes()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| PdfError::SaveError(format!("{}: {e}", dir.display())))?;
        staged
            .write_all(&bytes)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        staged
            .persist(path)
            .map_err(|e| PdfError::SaveError(format!("{}: {}", path.display(), e.error)))?;
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush_content_buffers()?;

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        if page == 0 {
            return Err(PdfError::InvalidPage(page, pages.len()));
        }
        pages
            .get(&(page as u32))
            .copied()
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    /// Visible box of a page, validating the page number
    fn page_box(&self, page: usize) -> Result<PageBox> {
        let page_id = self.page_id(page)?;
        let media_box = self.get_inherited_media_box(page_id)?;
        if media_box.len() < 4 {
            return Err(PdfError::ParseError("Invalid MediaBox format".to_string()));
        }

        let mut coords = [0.0f64; 4];
        for (slot, obj) in coords.iter_mut().zip(&media_box) {
            *slot = object_to_f64(obj)
                .ok_or_else(|| PdfError::ParseError("Invalid MediaBox value".to_string()))?;
        }
        let [x1, y1, x2, y2] = coords;
        let rotation = normalize_rotation(self.inherited_rotation(page_id)?);
        let (mut width, mut height) = ((x2 - x1).abs(), (y2 - y1).abs());
        if rotation == 90 || rotation == 270 {
            std::mem::swap(&mut width, &mut height);
        }
        Ok(PageBox {
            x0: x1.min(x2),
            y0: y1.min(y2),
            width,
            height,
            rotation,
        })
    }

    /// `/Rotate` of a page or the nearest ancestor that sets it
    fn inherited_rotation(&self, page_id: ObjectId) -> Result<i64> {
        let mut current_id = page_id;

        for _ in 0..10 {
            let dict = self
                .inner
                .get_object(current_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

            if let Ok(rotate) = dict.get(b"Rotate") {
                let rotate = match rotate {
                    Object::Reference(ref_id) => self.inner.get_object(*ref_id)?,
                    direct => direct,
                };
                return object_to_f64(rotate)
                    .map(|degrees| degrees.round() as i64)
                    .ok_or_else(|| PdfError::ParseError("Rotate is not a number".to_string()));
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(0)
    }

    /// Get MediaBox, following parent inheritance chain if needed
    fn get_inherited_media_box(&self, page_id: ObjectId) -> Result<Vec<Object>> {
        let mut current_id = page_id;

        for _ in 0..10 {
            let dict = self
                .inner
                .get_object(current_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

            if let Ok(media_box) = dict.get(b"MediaBox").or_else(|_| dict.get(b"CropBox")) {
                return match media_box {
                    Object::Array(arr) => Ok(arr.clone()),
                    Object::Reference(ref_id) => Ok(self
                        .inner
                        .get_object(*ref_id)?
                        .as_array()
                        .map_err(|_| {
                            PdfError::ParseError("MediaBox reference is not an array".to_string())
                        })?
                        .clone()),
                    _ => Err(PdfError::ParseError("MediaBox is not an array".to_string())),
                };
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        // Fallback: assume A4 page size
        Ok(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(PageSize::A4.width as f32),
            Object::Real(PageSize::A4.height as f32),
        ])
    }

    /// Resources dictionary of a page, resolving references and inheritance
    fn inherited_resources(&self, page_id: ObjectId) -> Result<Dictionary> {
        let mut current_id = page_id;

        for _ in 0..10 {
            let dict = self
                .inner
                .get_object(current_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

            match dict.get(b"Resources") {
                Ok(Object::Dictionary(resources)) => return Ok(resources.clone()),
                Ok(Object::Reference(ref_id)) => {
                    if let Ok(resources) = self.inner.get_object(*ref_id).and_then(Object::as_dict)
                    {
                        return Ok(resources.clone());
                    }
                }
                _ => {}
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(Dictionary::new())
    }

    /// Register an object under a page resource category, returning its name
    ///
    /// The page gets a direct Resources dictionary holding everything it
    /// previously inherited or referenced, plus the new entry.
    fn register_page_resource(
        &mut self,
        page: usize,
        category: &[u8],
        prefix: &str,
        object_id: ObjectId,
    ) -> Result<String> {
        if let Some(name) = self
            .page_resources
            .get(&page)
            .and_then(|names| names.get(&object_id))
        {
            return Ok(name.clone());
        }

        let page_id = self.page_id(page)?;
        let mut resources = self.inherited_resources(page_id)?;
        let mut entries = match resources.get(category) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(ref_id)) => self
                .inner
                .get_object(*ref_id)
                .and_then(Object::as_dict)
                .cloned()
                .unwrap_or_else(|_| Dictionary::new()),
            _ => Dictionary::new(),
        };

        let name = format!("{prefix}{}", self.next_resource);
        self.next_resource += 1;
        log::debug!("page {page}: registering {prefix} resource {name}");

        entries.set(name.as_bytes().to_vec(), Object::Reference(object_id));
        resources.set(category.to_vec(), Object::Dictionary(entries));

        let mut page_dict = self
            .inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();
        page_dict.set("Resources", Object::Dictionary(resources));
        self.inner.objects.insert(page_id, page_dict.into());

        self.page_resources
            .entry(page)
            .or_default()
            .insert(object_id, name.clone());
        Ok(name)
    }

    /// Resource name of a built-in font on a page
    fn get_or_create_font_ref(&mut self, font: BuiltinFont, page: usize) -> Result<String> {
        let object_id = match self.embedded_fonts.get(&font) {
            Some(id) => *id,
            None => {
                let id = self.inner.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => font.base_font(),
                    "Encoding" => "WinAnsiEncoding",
                });
                self.embedded_fonts.insert(font, id);
                id
            }
        };
        self.register_page_resource(page, b"Font", "XpF", object_id)
    }

    /// Resource name of an opacity graphics state, `None` when opaque
    fn opacity_ref(&mut self, page: usize, opacity: Option<f32>) -> Result<Option<String>> {
        let opacity = match opacity {
            Some(value) if value < 1.0 => value.max(0.0),
            _ => return Ok(None),
        };
        let key = (opacity * 1000.0).round() as u32;

        let object_id = match self.embedded_gstates.get(&key) {
            Some(id) => *id,
            None => {
                let alpha = key as f32 / 1000.0;
                let id = self.inner.add_object(dictionary! {
                    "Type" => "ExtGState",
                    "ca" => Object::Real(alpha),
                    "CA" => Object::Real(alpha),
                });
                self.embedded_gstates.insert(key, id);
                id
            }
        };
        self.register_page_resource(page, b"ExtGState", "XpGs", object_id)
            .map(Some)
    }

    /// Embed an image once per distinct content
    fn get_or_create_image<F>(&mut self, key: u64, build: F) -> Result<(ObjectId, u32, u32)>
    where
        F: FnOnce() -> Result<ImageXObject>,
    {
        if let Some(embedded) = self.embedded_images.get(&key) {
            return Ok(*embedded);
        }

        let xobject = build()?;
        let mut stream = xobject.to_pdf_stream();
        if let Some(smask) = xobject.smask_stream() {
            let smask_id = self.inner.add_object(smask);
            stream.dict.set("SMask", Object::Reference(smask_id));
        }
        let object_id = self.inner.add_object(stream);

        let embedded = (object_id, xobject.width, xobject.height);
        self.embedded_images.insert(key, embedded);
        Ok(embedded)
    }

    #[allow(clippy::too_many_arguments)]
    fn place_image(
        &mut self,
        page: usize,
        (object_id, pixel_width, pixel_height): (ObjectId, u32, u32),
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        options: &ImageOptions,
    ) -> Result<()> {
        let page_box = self.page_box(page)?;
        let name = self.register_page_resource(page, b"XObject", "XpIm", object_id)?;
        let gstate = self.opacity_ref(page, options.opacity)?;

        let placed = place_in_box((pixel_width, pixel_height), (width, height), options.fit);

        // Image space is anchored at the bottom-left corner
        let (pdf_x, pdf_y) = page_box.to_pdf(x + placed.dx, y + placed.dy + placed.height);
        let operators = generate_image_operators(
            &name,
            pdf_x,
            pdf_y,
            placed.width,
            placed.height,
            gstate.as_deref(),
        );
        self.buffer_content(page, options.layer, &operators);
        Ok(())
    }

    /// Buffer content operators for a page (written at save time)
    fn buffer_content(&mut self, page: usize, layer: Layer, content: &[u8]) {
        let buffer = match layer {
            Layer::Background => &mut self.page_background_buffer,
            Layer::Foreground => &mut self.page_content_buffer,
        };
        buffer.entry(page).or_default().extend_from_slice(content);
    }

    /// Flush all buffered content to page streams
    ///
    /// Called once during save/to_bytes. Each touched page gets one new
    /// content stream: background operators, the original content wrapped in
    /// its own graphics state, then foreground operators.
    fn flush_content_buffers(&mut self) -> Result<()> {
        let mut pages: Vec<usize> = self
            .page_content_buffer
            .keys()
            .chain(self.page_background_buffer.keys())
            .copied()
            .collect();
        pages.sort_unstable();
        pages.dedup();

        for page in pages {
            let background = self.page_background_buffer.remove(&page).unwrap_or_default();
            let foreground = self.page_content_buffer.remove(&page).unwrap_or_default();
            if !background.is_empty() || !foreground.is_empty() {
                self.rewrite_content_stream(page, &background, &foreground)?;
            }
        }

        Ok(())
    }

    /// The Contents entry of a page as a list of stream references
    fn content_parts(&self, page_dict: &Dictionary) -> Result<Vec<Object>> {
        let parts = match page_dict.get(b"Contents") {
            Ok(Object::Array(parts)) => parts.clone(),
            Ok(Object::Reference(ref_id)) => match self.inner.get_object(*ref_id)? {
                Object::Array(parts) => parts.clone(),
                _ => vec![Object::Reference(*ref_id)],
            },
            Ok(other) => vec![other.clone()],
            Err(_) => Vec::new(),
        };
        Ok(parts)
    }

    fn add_content_stream(&mut self, content: &[u8]) -> Result<Object> {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        let stream_id = self.inner.add_object(Stream::new(dict, deflate(content)?));
        Ok(Object::Reference(stream_id))
    }

    /// Point a page's Contents at background, original and foreground streams
    ///
    /// The original streams are referenced as they are, never decoded. Each
    /// layer runs in its own graphics state, and the original content is
    /// wrapped in `q ... Q` when a foreground follows it.
    fn rewrite_content_stream(
        &mut self,
        page: usize,
        background: &[u8],
        foreground: &[u8],
    ) -> Result<()> {
        let page_id = self.page_id(page)?;
        let matrix = self.page_box(page)?.upright_matrix();
        let mut page_dict = self
            .inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();
        let existing = self.content_parts(&page_dict)?;
        let wrap_existing = !existing.is_empty() && !foreground.is_empty();

        let mut contents = Vec::with_capacity(existing.len() + 3);
        if !background.is_empty() {
            contents.push(self.add_content_stream(&layer_content(background, matrix))?);
        }
        if wrap_existing {
            contents.push(self.add_content_stream(b"q\n")?);
        }
        contents.extend(existing);
        if !foreground.is_empty() {
            let mut tail = if wrap_existing {
                b"\nQ\n".to_vec()
            } else {
                Vec::new()
            };
            tail.extend_from_slice(&layer_content(foreground, matrix));
            contents.push(self.add_content_stream(&tail)?);
        }

        page_dict.set("Contents", Object::Array(contents));
        self.inner.objects.insert(page_id, page_dict.into());

        Ok(())
    }
}

/// Layer operators in their own graphics state, under `matrix` if given
fn layer_content(operators: &[u8], matrix: Option<[f64; 6]>) -> Vec<u8> {
    let mut content = Vec::with_capacity(operators.len() + 64);
    content.extend_from_slice(b"q\n");
    if let Some(m) = matrix {
        let operands: Vec<String> = m.iter().map(|&v| num(v)).collect();
        content.extend_from_slice(format!("{} cm\n", operands.join(" ")).as_bytes());
    }
    content.extend_from_slice(operators);
    content.extend_from_slice(b"Q\n");
    content
}

fn object_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(v) => Some(*v as f64),
        Object::Real(v) => Some(*v as f64),
        _ => None,
    }
}
