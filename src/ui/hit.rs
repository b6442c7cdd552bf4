use ratatui::layout::Rect;

/// A clickable element on the current frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HitTarget {
    StoryButton { section: usize, button: usize },
    MenuToggle,
    MenuItem { index: usize },
    SubmenuItem { parent: usize, index: usize },
    ConfirmYes,
    ConfirmNo,
    WarningOk,
    NoticeOk,
    GuideHandle,
    GuideClose,
    ScrollTop,
}

#[derive(Clone, Debug)]
struct HitRegion {
    rect: Rect,
    target: Option<HitTarget>,
    parent: Option<usize>,
    disabled: bool,
}

/// Per-frame registry of clickable regions, rebuilt on every render.
///
/// Regions form a tree through `parent` links; a hit inside a subtree whose
/// ancestor is disabled is ignored entirely, mirroring how events bubbling
/// out of a disabled container are dropped.
#[derive(Debug, Default)]
pub struct HitMap {
    regions: Vec<HitRegion>,
}

impl HitMap {
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Register a non-clickable container; children reference it by index.
    pub fn container(&mut self, rect: Rect, parent: Option<usize>, disabled: bool) -> usize {
        self.regions.push(HitRegion {
            rect,
            target: None,
            parent,
            disabled,
        });
        self.regions.len() - 1
    }

    pub fn target(&mut self, rect: Rect, target: HitTarget, parent: Option<usize>) {
        self.regions.push(HitRegion {
            rect,
            target: Some(target),
            parent,
            disabled: false,
        });
    }

    /// Topmost target under the pointer, unless it or an ancestor is
    /// disabled. Later registrations win, matching paint order.
    pub fn hit(&self, x: u16, y: u16) -> Option<&HitTarget> {
        for (idx, region) in self.regions.iter().enumerate().rev() {
            if region.target.is_some() && contains(region.rect, x, y) {
                if self.in_disabled_subtree(idx) {
                    return None;
                }
                return region.target.as_ref();
            }
        }
        None
    }

    /// Iterative ancestor walk; terminates at a region with no parent.
    fn in_disabled_subtree(&self, mut idx: usize) -> bool {
        loop {
            let region = &self.regions[idx];
            if region.disabled {
                return true;
            }
            match region.parent {
                Some(parent) if parent < idx => idx = parent,
                _ => return false,
            }
        }
    }
}

fn contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: u16, y: u16, w: u16, h: u16) -> Rect {
        Rect::new(x, y, w, h)
    }

    #[test]
    fn test_hit_and_miss() {
        let mut map = HitMap::default();
        map.target(rect(2, 2, 10, 1), HitTarget::WarningOk, None);
        assert_eq!(map.hit(5, 2), Some(&HitTarget::WarningOk));
        assert_eq!(map.hit(5, 3), None);
        assert_eq!(map.hit(12, 2), None);
    }

    #[test]
    fn test_topmost_region_wins() {
        let mut map = HitMap::default();
        map.target(rect(0, 0, 20, 5), HitTarget::MenuToggle, None);
        map.target(rect(2, 2, 4, 1), HitTarget::ConfirmYes, None);
        assert_eq!(map.hit(3, 2), Some(&HitTarget::ConfirmYes));
        assert_eq!(map.hit(10, 0), Some(&HitTarget::MenuToggle));
    }

    #[test]
    fn test_disabled_ancestor_swallows_the_event() {
        let mut map = HitMap::default();
        let story = map.container(rect(0, 0, 40, 10), None, true);
        map.target(
            rect(2, 3, 8, 1),
            HitTarget::StoryButton { section: 0, button: 0 },
            Some(story),
        );
        // The button is under the pointer but its container is disabled, so
        // the event is dropped, not redirected.
        assert_eq!(map.hit(4, 3), None);
    }

    #[test]
    fn test_enabled_tree_passes_through() {
        let mut map = HitMap::default();
        let outer = map.container(rect(0, 0, 40, 10), None, false);
        let inner = map.container(rect(1, 1, 30, 8), Some(outer), false);
        map.target(
            rect(2, 3, 8, 1),
            HitTarget::StoryButton { section: 1, button: 2 },
            Some(inner),
        );
        assert_eq!(
            map.hit(4, 3),
            Some(&HitTarget::StoryButton { section: 1, button: 2 })
        );
    }
}
