use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutPoint {
    pub x: f64,
    pub y: f64,
}

impl LayoutPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut it = points.into_iter();
        let (x0, y0) = it.next()?;
        let mut b = Self {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for (x, y) in it {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutLabel {
    pub x: f64,
    /// Text baseline.
    pub y: f64,
    pub text: String,
    pub font_size: f64,
}

/// One placed individual. `x`/`y` is the symbol center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSymbol {
    pub id: String,
    pub generation: u32,
    pub x: f64,
    pub y: f64,
    /// Edge length of the symbol's bounding box.
    pub size: f64,
    /// Horizontal range reserved for the symbol and its labels.
    pub footprint: f64,
    pub name_label: LayoutLabel,
    pub age_label: Option<LayoutLabel>,
}

impl LayoutSymbol {
    pub fn left(&self) -> f64 {
        self.x - self.size / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.size / 2.0
    }

    pub fn top(&self) -> f64 {
        self.y - self.size / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.size / 2.0
    }
}

/// Horizontal line between two partner symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarriageLayout {
    /// Index into `Pedigree::partnerships`.
    pub partnership: usize,
    pub members: [String; 2],
    pub from: LayoutPoint,
    pub to: LayoutPoint,
}

impl MarriageLayout {
    pub fn midpoint(&self) -> LayoutPoint {
        LayoutPoint::new(
            (self.from.x + self.to.x) / 2.0,
            (self.from.y + self.to.y) / 2.0,
        )
    }
}

/// Descent connector for one sibling group: a stem from the parents down to the sibling bus, the
/// bus itself, and one drop per child ending at the child's symbol top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescentLayout {
    pub parents: Vec<String>,
    pub partnership: Option<usize>,
    pub children: Vec<String>,
    pub origin: LayoutPoint,
    pub bus_y: f64,
    pub stem: Vec<LayoutPoint>,
    pub bus: Vec<LayoutPoint>,
    pub drops: Vec<Vec<LayoutPoint>>,
}

impl DescentLayout {
    pub fn polylines(&self) -> impl Iterator<Item = &[LayoutPoint]> {
        std::iter::once(self.stem.as_slice())
            .chain(std::iter::once(self.bus.as_slice()))
            .chain(self.drops.iter().map(Vec::as_slice))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub width: f64,
    pub height: f64,
    /// Uniform factor applied to coordinates and sizes; `1.0` when the content fits.
    pub scale: f64,
    /// Symbols in generation-row order.
    pub symbols: Vec<LayoutSymbol>,
    pub marriages: Vec<MarriageLayout>,
    pub descents: Vec<DescentLayout>,
    pub bounds: Option<Bounds>,
}

impl LayoutResult {
    pub fn symbol(&self, id: &str) -> Option<&LayoutSymbol> {
        self.symbols.iter().find(|s| s.id == id)
    }

    pub fn to_json(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
