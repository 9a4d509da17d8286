/// Metadata of one archive member, available without decompressing it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberHeader {
    pub index: usize,
    /// Raw name as recorded in the archive, `/`-separated.
    pub name: String,
    pub compressed_size: u64,
    pub size: u64,
    pub is_dir: bool,
    /// False when the name is absolute or climbs out with `..`.
    pub enclosed: bool,
}

impl MemberHeader {
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }
}
