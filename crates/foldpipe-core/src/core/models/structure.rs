use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// A single atom of a predicted structure.
///
/// Coordinates are in Ångström. The b-factor column carries the per-residue
/// confidence once it has been stamped onto the structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub name: String,
    pub element: String,
    pub position: Point3<f64>,
    pub occupancy: f64,
    pub b_factor: f64,
}

impl Atom {
    pub fn new(name: impl Into<String>, element: impl Into<String>, position: Point3<f64>) -> Self {
        Self {
            name: name.into(),
            element: element.into(),
            position,
            occupancy: 1.0,
            b_factor: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Residue {
    pub name: String,
    pub seq_number: i32,
    pub atoms: Vec<Atom>,
}

impl Residue {
    pub fn new(name: impl Into<String>, seq_number: i32) -> Self {
        Self {
            name: name.into(),
            seq_number,
            atoms: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub id: char,
    pub residues: Vec<Residue>,
}

impl Chain {
    pub fn new(id: char) -> Self {
        Self {
            id,
            residues: Vec::new(),
        }
    }
}

/// A predicted molecular structure: chains of residues of atoms.
///
/// Structures are immutable once produced by a runner; the only sanctioned
/// derivation is [`Structure::with_confidence_b_factors`], which returns a
/// stamped copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub chains: Vec<Chain>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn residue_count(&self) -> usize {
        self.chains.iter().map(|c| c.residues.len()).sum()
    }

    pub fn atom_count(&self) -> usize {
        self.chains
            .iter()
            .flat_map(|c| c.residues.iter())
            .map(|r| r.atoms.len())
            .sum()
    }

    /// Iterates residues in chain order, paired with their chain id.
    pub fn residues(&self) -> impl Iterator<Item = (char, &Residue)> {
        self.chains
            .iter()
            .flat_map(|c| c.residues.iter().map(move |r| (c.id, r)))
    }

    /// Returns a copy with `scores[i]` written into the b-factor of every
    /// atom of the i-th residue (flattened across chains). Residues beyond
    /// the score slice keep their existing b-factors.
    pub fn with_confidence_b_factors(&self, scores: &[f64]) -> Structure {
        let mut stamped = self.clone();
        let mut index = 0usize;
        for chain in &mut stamped.chains {
            for residue in &mut chain.residues {
                if let Some(&score) = scores.get(index) {
                    for atom in &mut residue.atoms {
                        atom.b_factor = score;
                    }
                }
                index += 1;
            }
        }
        stamped
    }
}
