use serde::{Deserialize, Serialize};

/// One page of a cursor-paginated list
///
/// `next_cursor` is set whenever `items` is non-empty; `has_more` tells the
/// client whether following it will yield anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>, has_more: bool) -> Self {
        Self {
            items,
            next_cursor,
            has_more,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), None, false)
    }

    /// Converts the items while keeping the cursor and the has-more flag
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }

    /// Like [`Page::map`], failing on the first item that does not convert
    pub fn try_map<U, E, F>(self, f: F) -> Result<Page<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        })
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_fields() {
        let page = Page::new(vec![1, 2], Some("Mg==".to_string()), true);
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "items": [1, 2], "nextCursor": "Mg==", "hasMore": true })
        );
    }

    #[test]
    fn empty_page_has_null_cursor() {
        let json = serde_json::to_value(Page::<u8>::empty()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "items": [], "nextCursor": null, "hasMore": false })
        );
    }

    #[test]
    fn map_keeps_pagination_state() {
        let page = Page::new(vec![1, 2, 3], Some("Mw==".to_string()), false).map(|n| n * 10);

        assert_eq!(page.items, vec![10, 20, 30]);
        assert_eq!(page.next_cursor.as_deref(), Some("Mw=="));
        assert!(!page.has_more);
    }

    #[test]
    fn try_map_stops_at_the_first_failure() {
        let page = Page::new(vec![1, 2, 3], Some("Mw==".to_string()), true);

        let doubled: Result<Page<i32>, String> = page.clone().try_map(|n| Ok(n * 2));
        assert_eq!(doubled.unwrap().items, vec![2, 4, 6]);

        let failed = page.try_map(|n| if n == 2 { Err(format!("bad {n}")) } else { Ok(n) });
        assert_eq!(failed.unwrap_err(), "bad 2");
    }
}
