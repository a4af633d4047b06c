use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use eternity_types::ContentHash;

/// One repair performed by a reconcile pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Repair {
    /// Indexed, but its file was gone. The entry was dropped.
    DroppedMissing(ContentHash),
    /// Indexed, but the file no longer hashed to its name. File and entry removed.
    RemovedCorrupt {
        hash: ContentHash,
        computed: ContentHash,
    },
    /// Unindexed file whose name matched its contents. Added to the index.
    Adopted(ContentHash),
    /// Unindexed file whose name did not match its contents. Deleted.
    RemovedUntrusted(OsString),
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DroppedMissing(hash) => write!(f, "dropped {hash}: file missing"),
            Self::RemovedCorrupt { hash, computed } => {
                write!(f, "removed {hash}: contents hash to {computed}")
            }
            Self::Adopted(hash) => write!(f, "adopted {hash}"),
            Self::RemovedUntrusted(name) => {
                write!(f, "removed untrusted file {}", name.to_string_lossy())
            }
        }
    }
}

/// Summary of a reconcile pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Indexed objects whose contents still matched.
    pub verified: usize,
    pub repairs: Vec<Repair>,
    /// Files that could not be read. They are left as they are.
    pub unreadable: Vec<PathBuf>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty() && self.unreadable.is_empty()
    }

    pub fn adopted(&self) -> usize {
        self.count(|r| matches!(r, Repair::Adopted(_)))
    }

    pub fn removed(&self) -> usize {
        self.repairs.len() - self.adopted()
    }

    fn count(&self, pred: impl Fn(&Repair) -> bool) -> usize {
        self.repairs.iter().filter(|r| pred(r)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_clean() {
        let report = ReconcileReport::default();
        assert!(report.is_clean());
        assert_eq!(report.adopted(), 0);
        assert_eq!(report.removed(), 0);
    }

    #[test]
    fn counts_split_adopted_and_removed() {
        let h = ContentHash::compute(b"a");
        let report = ReconcileReport {
            verified: 3,
            repairs: vec![
                Repair::Adopted(h),
                Repair::DroppedMissing(h),
                Repair::RemovedUntrusted("junk".into()),
            ],
            unreadable: Vec::new(),
        };
        assert!(!report.is_clean());
        assert_eq!(report.adopted(), 1);
        assert_eq!(report.removed(), 2);
    }

    #[test]
    fn unreadable_files_make_report_unclean() {
        let report = ReconcileReport {
            unreadable: vec![PathBuf::from("objects/locked")],
            ..Default::default()
        };
        assert!(!report.is_clean());
        assert_eq!(report.removed(), 0);
    }

    #[test]
    fn repair_display_names_the_hash() {
        let h = ContentHash::compute(b"a");
        assert!(Repair::Adopted(h).to_string().contains(&h.to_hex()));
        assert_eq!(
            Repair::RemovedUntrusted("junk".into()).to_string(),
            "removed untrusted file junk"
        );
    }
}
