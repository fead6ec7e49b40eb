//! Collision-free label generation for the front end.
//!
//! One generator lives per compilation unit; a single shared counter keeps
//! every control-flow label in the unit unique regardless of which base
//! it was minted under. The back end carries its own counters for
//! comparison and call-site labels (see `translator`).

#[derive(Debug, Default)]
pub struct LabelGen {
  next: usize,
}

impl LabelGen {
  pub fn new() -> Self {
    Self::default()
  }

  /// Mint `BASE_N` for a strictly increasing `N`.
  pub fn fresh(&mut self, base: &str) -> String {
    let label = format!("{base}_{}", self.next);
    self.next += 1;
    label
  }
}
