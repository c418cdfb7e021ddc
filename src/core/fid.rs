/// A parsed feature identifier of the form `fig|<genome>.<type>.<num>`,
/// where the genome component is itself dotted (e.g. `fig|511145.12.peg.4`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fid {
    /// Genome identifier (e.g. `511145.12`)
    pub genome: String,
    /// Feature type (e.g. `peg`, `rna`)
    pub ftype: String,
    /// Ordinal number of the feature within its genome and type
    pub num: u64,
}

impl Fid {
    /// Parse a feature identifier. Returns `None` if the string does not have
    /// the `fig|genome.type.num` shape.
    pub fn parse(fid: &str) -> Option<Self> {
        let rest = fid.strip_prefix("fig|")?;
        // The last two dotted components are the type and the number; the
        // genome id keeps its own internal dots.
        let (front, num) = rest.rsplit_once('.')?;
        let (genome, ftype) = front.rsplit_once('.')?;
        if genome.is_empty() || ftype.is_empty() {
            return None;
        }
        let num: u64 = num.parse().ok()?;
        Some(Self {
            genome: genome.to_string(),
            ftype: ftype.to_string(),
            num,
        })
    }
}

impl std::fmt::Display for Fid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fig|{}.{}.{}", self.genome, self.ftype, self.num)
    }
}
