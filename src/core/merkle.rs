use crate::utils::sha256_hex;

/// Root returned for an empty leaf list
pub const NULL_ROOT: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Fold an ordered list of leaf digests into a single root.
///
/// Adjacent pairs are combined as SHA256(left ∥ right) over the hex strings;
/// an unpaired final element is carried up unchanged. Used twice per block:
/// once over transaction hashes and once over per-account state digests.
pub fn merkle_root(leaves: &[String]) -> String {
    if leaves.is_empty() {
        return NULL_ROOT.to_string();
    }

    let mut level: Vec<String> = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            if pair.len() == 2 {
                next.push(sha256_hex(&format!("{}{}", pair[0], pair[1])));
            } else {
                next.push(pair[0].clone());
            }
        }
        level = next;
    }
    level.remove(0)
}
