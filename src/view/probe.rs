// src/view/probe.rs
//
// Ordered chain of mark probes. Each probe looks at one capability of a cell
// and either answers confidently or passes. The first answer wins; a cell no
// probe recognizes is empty. New probes are appended, existing ones untouched.

use super::CellSnapshot;
use crate::config::consts::{CHECKED_GLYPH_HINT, MARKED_CLASS};
use crate::model::CellMark;

pub trait MarkProbe: Send + Sync {
    fn name(&self) -> &'static str;
    fn probe(&self, cell: &CellSnapshot) -> Option<CellMark>;
}

/// Boolean input control: its checked state is authoritative.
pub struct CheckboxProbe;

impl MarkProbe for CheckboxProbe {
    fn name(&self) -> &'static str { "checkbox" }

    fn probe(&self, cell: &CellSnapshot) -> Option<CellMark> {
        cell.checkbox.map(|checked| if checked { CellMark::Present } else { CellMark::Empty })
    }
}

/// Structural "marked" class. Absence of the class is not an answer.
pub struct ClassProbe {
    pub marked_class: String,
}

impl Default for ClassProbe {
    fn default() -> Self { Self { marked_class: s!(MARKED_CLASS) } }
}

impl MarkProbe for ClassProbe {
    fn name(&self) -> &'static str { "class" }

    fn probe(&self, cell: &CellSnapshot) -> Option<CellMark> {
        cell.classes
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&self.marked_class))
            .then_some(CellMark::Present)
    }
}

/// Graphical marker: filled/checked glyph vs empty outline.
pub struct GlyphProbe {
    pub checked_hint: String,
}

impl Default for GlyphProbe {
    fn default() -> Self { Self { checked_hint: s!(CHECKED_GLYPH_HINT) } }
}

impl MarkProbe for GlyphProbe {
    fn name(&self) -> &'static str { "glyph" }

    fn probe(&self, cell: &CellSnapshot) -> Option<CellMark> {
        let shape = cell.glyph.as_deref()?;
        Some(if shape.contains(&self.checked_hint) { CellMark::Present } else { CellMark::Empty })
    }
}

pub struct ProbeChain {
    probes: Vec<Box<dyn MarkProbe>>,
}

impl Default for ProbeChain {
    fn default() -> Self { Self::standard() }
}

impl ProbeChain {
    pub fn empty() -> Self { Self { probes: Vec::new() } }

    /// checkbox → class → glyph
    pub fn standard() -> Self {
        Self::empty()
            .with(CheckboxProbe)
            .with(ClassProbe::default())
            .with(GlyphProbe::default())
    }

    pub fn with(mut self, probe: impl MarkProbe + 'static) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    pub fn classify(&self, cell: &CellSnapshot) -> CellMark {
        self.probes
            .iter()
            .find_map(|p| p.probe(cell))
            .unwrap_or(CellMark::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell() -> CellSnapshot { CellSnapshot::default() }

    #[test]
    fn checkbox_wins_over_class() {
        let c = CellSnapshot { checkbox: Some(false), classes: vec![s!("marked")], ..cell() };
        assert_eq!(ProbeChain::standard().classify(&c), CellMark::Empty);
    }

    #[test]
    fn class_answers_before_glyph() {
        let c = CellSnapshot { classes: vec![s!("Marked")], glyph: Some(s!("M0 0 outline")), ..cell() };
        assert_eq!(ProbeChain::standard().classify(&c), CellMark::Present);
    }

    #[test]
    fn glyph_distinguishes_filled_and_outline() {
        let chain = ProbeChain::standard();
        let filled = CellSnapshot { glyph: Some(s!(r#"fill-rule="evenodd" d="M1 1""#)), ..cell() };
        let outline = CellSnapshot { glyph: Some(s!(r#"d="M12 2a10 10 0""#)), ..cell() };
        assert_eq!(chain.classify(&filled), CellMark::Present);
        assert_eq!(chain.classify(&outline), CellMark::Empty);
    }

    #[test]
    fn unrecognized_cell_is_empty() {
        assert_eq!(ProbeChain::standard().classify(&cell()), CellMark::Empty);
        assert_eq!(ProbeChain::empty().classify(&cell()), CellMark::Empty);
    }

    #[test]
    fn custom_probe_appends_without_touching_others() {
        struct TextProbe;
        impl MarkProbe for TextProbe {
            fn name(&self) -> &'static str { "text" }
            fn probe(&self, cell: &CellSnapshot) -> Option<CellMark> {
                (cell.text == "✓").then_some(CellMark::Present)
            }
        }
        let chain = ProbeChain::standard().with(TextProbe);
        assert_eq!(chain.names(), vec!["checkbox", "class", "glyph", "text"]);
        let c = CellSnapshot { text: s!("✓"), ..cell() };
        assert_eq!(chain.classify(&c), CellMark::Present);
    }
}
