/// The navigation target handed from the popup to the content script
use crate::error::Result;
use crate::model::NavigationTarget;
use crate::storage::{KeyValueStore, NAV_TARGET_KEY, get_typed, set_typed};

/// Drop all whitespace and lowercase, for tolerant text matching against the
/// portal's tables
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

pub async fn store_target<S: KeyValueStore>(store: &S, target: &NavigationTarget) -> Result<()> {
    set_typed(store, NAV_TARGET_KEY, target).await
}

/// The stored target, complete or not
pub async fn load_target<S: KeyValueStore>(store: &S) -> Result<Option<NavigationTarget>> {
    get_typed(store, NAV_TARGET_KEY).await
}

pub async fn clear_target<S: KeyValueStore>(store: &S) -> Result<()> {
    store.remove(NAV_TARGET_KEY).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use futures::executor::block_on;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Tugas 1 "), "tugas1");
        assert_eq!(normalize("Tugas 1"), normalize("tugas1"));
        assert_eq!(normalize("TI\t101\n"), "ti101");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["Pertemuan 12", "  Laporan   Akhir ", "2425191A", "ÄBC d"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_target_round_trip_and_clear() {
        let store = MemoryStore::new();
        let target = NavigationTarget::new("2425191A", "Pertemuan1", "Laporan Akhir");

        block_on(async {
            store_target(&store, &target).await.unwrap();
            assert_eq!(load_target(&store).await.unwrap(), Some(target.clone()));

            clear_target(&store).await.unwrap();
            assert_eq!(load_target(&store).await.unwrap(), None);
        });
    }
}
