//! Built-in building-code corpus. Used by the mock source and as the last-resort
//! keyword corpus when nothing else was ever loaded.

use crate::chunks::{Chunk, ChunkConfig};
use crate::source::{Document, DocumentBuilder};

/// `(clause, text)` pairs, in document order.
pub const MOCK_CLAUSES: &[(&str, &str)] = &[
    (
        "4.1.3.2",
        "NBCC Clause 4.1.3.2 - Principal Load Combinations for Ultimate Limit States

The following load combinations shall be considered for ultimate limit states:

1. Combination 1 (Dead + Live + Snow):
   Factored Load = 1.4D + 1.5L + 0.5S
2. Combination 2 (Dead + Live dominant):
   Factored Load = 1.25D + 1.5L + 0.5S
3. Combination 3 (Dead + Snow dominant):
   Factored Load = 1.25D + 0.5L + 1.5S

The governing combination shall be the one producing maximum effects (moment, shear, etc.).",
    ),
    (
        "8.4.2",
        "NBCC Clause 8.4.2 - Material Resistance Factors

The following resistance factors (φ) shall be used in design:

1. Concrete in flexure and axial compression: φc = 0.65
2. Concrete in bearing: φc = 0.60
3. Reinforcing steel in tension and compression: φs = 0.85
4. Prestressing steel: φp = 0.90

Application: Factored Resistance = φ × Nominal Resistance
These factors account for material variability and workmanship quality.",
    ),
    (
        "10.5",
        "NBCC Clause 10.5 - Flexural Design of Reinforced Concrete Beams

10.5.1 - Design Assumptions:
- Plane sections remain plane (linear strain distribution)
- Maximum concrete compressive strain = 0.0035
- Tensile strength of concrete is neglected

10.5.2 - Rectangular Stress Block Parameters:
- α1 = 0.85 - 0.0015 × fc' ≥ 0.67
- β1 = 0.97 - 0.0025 × fc' ≥ 0.67
- a = β1 × c

10.5.3 - Factored Moment Resistance:
Mr = φs × As × fy × (d - a/2)

10.5.4 - Minimum Reinforcement Requirement:
As,min = maximum of 0.2√fc' × b × d / fy and 1.4 × b × d / fy

10.5.5 - Maximum Reinforcement for Ductility:
ρ ≤ 0.75 × ρb, where ρb is the balanced reinforcement ratio.",
    ),
    (
        "11.3",
        "NBCC Clause 11.3 - Shear Design in Beams and One-Way Slabs

11.3.3 - Concrete Shear Resistance:
Vc = φc × 0.2 × λ × √fc' × bw × dv
where dv, the effective shear depth, may be taken as 0.9d.

11.3.4 - Shear reinforcement is required when Vf > Vc.

11.3.5 - Design of Shear Reinforcement:
Vs = Vf - Vc; for vertical stirrups Vs = (Av × fy × dv) / s,
so the stirrup spacing s = (Av × fy × dv) / Vs.

11.3.6 - Maximum Spacing of Shear Reinforcement:
s ≤ 0.7 × dv and s ≤ 600 mm.

11.3.7 - Minimum Shear Reinforcement:
When Vf > 0.5 × Vc, Av,min / s = 0.06 × √fc' × bw / fy.",
    ),
    (
        "9.8",
        "NBCC Clause 9.8 - Deflection Control and Serviceability

9.8.2 - Minimum Thickness (Span-to-Depth Ratios):
1. Simply Supported Beams: L/d ≤ 20
2. One End Continuous: L/d ≤ 24
3. Both Ends Continuous: L/d ≤ 26
4. Cantilever: L/d ≤ 8

9.8.3 - Maximum Permissible Computed Deflections:
- Long-term deflection after attachment of non-structural elements: L/240
- Deflection occurring after attachment of non-structural elements: L/480

9.8.4 - Control of Cracking:
s ≤ 15(1000/fs) - 2.5cc but not greater than 11(1000/fs).",
    ),
    (
        "7.4",
        "NBCC Clause 7.4 - Concrete Cover Requirements

7.4.1 - Minimum Cover for Cast-in-Place Concrete:
Formed surfaces exposed to weather or ground: 40 mm minimum.
Formed surfaces not exposed to weather (interior): 30 mm minimum.
Unformed surfaces exposed to weather or ground: 20 mm minimum.

Clear cover shall not be less than 1.5 times the maximum nominal aggregate size.
Protection against corrosion and fire resistance depends on adequate concrete cover.",
    ),
    (
        "7.7",
        "NBCC Clause 7.7 - Spacing of Reinforcement

7.7.1 - Minimum Clear Spacing Between Parallel Bars:
The greatest of 1.4 times the bar diameter, 1.4 times the maximum aggregate size, and 30 mm.

7.7.2 - Maximum Spacing for Crack Control:
s ≤ 500 × (280/fs), where fs ≈ (2/3) × fy × (service moment / factored moment).",
    ),
    (
        "12.10",
        "NBCC Clause 12.10 - Development and Lap Splices of Reinforcement

12.10.1 - Tension Development Length:
ld = 0.45 × k1 × k2 × k3 × k4 × (fy / √fc') × db
k1 bar location, k2 coating, k3 concrete density, k4 bar size factors.

12.10.2 - Lap Splices in Tension:
Class A splices: 1.3 × ld. Class B splices: 1.7 × ld.
Lap splices shall not be used for bars larger than 35M in tension.",
    ),
];

/// The built-in corpus as one document, each clause tagged in the clause map.
pub fn document() -> Document {
    let mut builder = DocumentBuilder::default();
    for (clause, text) in MOCK_CLAUSES {
        builder.push(clause, text);
    }
    builder.finish()
}

/// The built-in corpus chunked with default parameters.
pub fn chunks() -> Vec<Chunk> {
    ChunkConfig::default().split_document(&document())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mock_chunk_is_tagged() {
        let chunks = chunks();
        assert_eq!(chunks.len(), MOCK_CLAUSES.len());
        assert!(chunks.iter().all(|c| !c.source_tag.is_empty()));
        assert_eq!(chunks[0].source_tag, "4.1.3.2");
    }

    #[test]
    fn mock_document_is_stable() {
        assert_eq!(document(), document());
    }
}
