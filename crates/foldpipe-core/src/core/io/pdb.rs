use crate::core::io::traits::StructureFile;
use crate::core::models::structure::Structure;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Writer for the fixed-column PDB coordinate format.
///
/// Emits a single MODEL block: ATOM records with the per-residue confidence
/// in the b-factor column, a TER record per chain, then ENDMDL/END.
pub struct PdbFile;

// Names shorter than four characters start in column 14, per convention.
fn format_atom_name(name: &str) -> String {
    if name.len() >= 4 {
        name.chars().take(4).collect()
    } else {
        format!(" {:<3}", name)
    }
}

impl StructureFile for PdbFile {
    type Metadata = ();
    type Error = PdbError;

    fn write_to(
        structure: &Structure,
        _metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "MODEL     1")?;
        let mut serial = 1usize;
        for chain in &structure.chains {
            let mut last_residue = None;
            for residue in &chain.residues {
                for atom in &residue.atoms {
                    writeln!(
                        writer,
                        "ATOM  {:>5} {}{}{:>3} {}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}{:>2}",
                        serial,
                        format_atom_name(&atom.name),
                        ' ', // altLoc
                        residue.name,
                        chain.id,
                        residue.seq_number,
                        ' ', // insertion code
                        atom.position.x,
                        atom.position.y,
                        atom.position.z,
                        atom.occupancy,
                        atom.b_factor,
                        atom.element,
                        "", // charge
                    )?;
                    serial += 1;
                }
                last_residue = Some(residue);
            }
            if let Some(residue) = last_residue {
                writeln!(
                    writer,
                    "TER   {:>5}      {:>3} {}{:>4}",
                    serial, residue.name, chain.id, residue.seq_number
                )?;
                serial += 1;
            }
        }
        writeln!(writer, "ENDMDL")?;
        writeln!(writer, "END")?;
        Ok(())
    }
}
