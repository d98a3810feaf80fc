use crate::core::io::traits::StructureFile;
use crate::core::models::structure::Structure;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CifError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Block-level metadata for an mmCIF file.
#[derive(Debug, Clone, PartialEq)]
pub struct CifMetadata {
    /// Identifier of the `data_` block (the original emits the model index
    /// or rank position here).
    pub entry_id: String,
    /// Human-readable model kind, e.g. "Monomer" or "Multimer".
    pub model_kind: String,
}

impl CifMetadata {
    pub fn new(entry_id: impl Into<String>, model_kind: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            model_kind: model_kind.into(),
        }
    }
}

/// Writer for a minimal mmCIF rendition: one `data_` block with an
/// `atom_site` loop mirroring the PDB output.
pub struct CifFile;

impl StructureFile for CifFile {
    type Metadata = CifMetadata;
    type Error = CifError;

    fn write_to(
        structure: &Structure,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "data_{}", metadata.entry_id)?;
        writeln!(writer, "#")?;
        writeln!(writer, "_entry.id {}", metadata.entry_id)?;
        writeln!(writer, "_struct.title 'Predicted structure ({})'", metadata.model_kind)?;
        writeln!(writer, "#")?;
        writeln!(writer, "loop_")?;
        for field in [
            "group_PDB",
            "id",
            "type_symbol",
            "label_atom_id",
            "label_comp_id",
            "label_asym_id",
            "label_seq_id",
            "Cartn_x",
            "Cartn_y",
            "Cartn_z",
            "occupancy",
            "B_iso_or_equiv",
            "pdbx_PDB_model_num",
        ] {
            writeln!(writer, "_atom_site.{}", field)?;
        }

        let mut serial = 1usize;
        for chain in &structure.chains {
            for residue in &chain.residues {
                for atom in &residue.atoms {
                    writeln!(
                        writer,
                        "ATOM {} {} {} {} {} {} {:.3} {:.3} {:.3} {:.2} {:.2} 1",
                        serial,
                        atom.element,
                        atom.name,
                        residue.name,
                        chain.id,
                        residue.seq_number,
                        atom.position.x,
                        atom.position.y,
                        atom.position.z,
                        atom.occupancy,
                        atom.b_factor,
                    )?;
                    serial += 1;
                }
            }
        }
        writeln!(writer, "#")?;
        Ok(())
    }
}
