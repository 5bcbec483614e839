use crate::config::GuillotineSplit;
use crate::model::Rect;

/// Chosen position for a slot inside a bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Index of the free rectangle the slot was carved from.
    pub free_index: usize,
    /// Occupied area (already rotated when `rotated`).
    pub slot: Rect,
    pub rotated: bool,
    /// Leftover area of the chosen free rectangle; lower is better.
    pub score: u64,
}

/// Free-list of one page, split guillotine style after every placement.
#[derive(Debug, Clone)]
pub struct GuillotineBin {
    split: GuillotineSplit,
    free: Vec<Rect>,
}

impl GuillotineBin {
    pub fn new(area: Rect, split: GuillotineSplit) -> Self {
        Self {
            split,
            free: vec![area],
        }
    }

    pub fn free_rects(&self) -> &[Rect] {
        &self.free
    }

    /// Best-area-fit search for a `w`x`h` slot.
    ///
    /// Among free rectangles that fit, the one leaving the least area wins; equal
    /// scores prefer the smaller `y`, then the smaller `x`. The rotated
    /// orientation replaces the upright one only if its score is strictly lower.
    pub fn find(&self, w: u32, h: u32, allow_rotation: bool) -> Option<Placement> {
        let upright = self.best_fit(w, h, false);
        if !allow_rotation || w == h {
            return upright;
        }
        let rotated = self.best_fit(h, w, true);
        match (upright, rotated) {
            (Some(u), Some(r)) if r.score < u.score => Some(r),
            (None, r) => r,
            (u, _) => u,
        }
    }

    fn best_fit(&self, w: u32, h: u32, rotated: bool) -> Option<Placement> {
        let mut best: Option<Placement> = None;
        let needed = w as u64 * h as u64;
        for (i, fr) in self.free.iter().enumerate() {
            if fr.w < w || fr.h < h {
                continue;
            }
            let score = fr.area() - needed;
            let better = match &best {
                None => true,
                Some(b) => (score, fr.y, fr.x) < (b.score, b.slot.y, b.slot.x),
            };
            if better {
                best = Some(Placement {
                    free_index: i,
                    slot: Rect::new(fr.x, fr.y, w, h),
                    rotated,
                    score,
                });
            }
        }
        best
    }

    /// Commits a placement returned by [`GuillotineBin::find`].
    pub fn place(&mut self, placement: &Placement) {
        let fr = self.free.swap_remove(placement.free_index);
        let (bottom, right) = self.split_free_rect(&fr, &placement.slot);
        self.free.extend(bottom);
        self.free.extend(right);
        self.prune_free_list();
    }

    fn split_free_rect(&self, fr: &Rect, placed: &Rect) -> (Option<Rect>, Option<Rect>) {
        let w_right = fr.right() - placed.right();
        let h_bottom = fr.bottom() - placed.bottom();

        let split_horizontal = match self.split {
            GuillotineSplit::ShorterLeftoverAxis => w_right <= h_bottom,
            GuillotineSplit::LongerLeftoverAxis => w_right > h_bottom,
            GuillotineSplit::MinimizeArea => {
                placed.w as u64 * h_bottom as u64 > w_right as u64 * placed.h as u64
            }
            GuillotineSplit::MaximizeArea => {
                placed.w as u64 * h_bottom as u64 <= w_right as u64 * placed.h as u64
            }
            GuillotineSplit::ShorterAxis => fr.w <= fr.h,
            GuillotineSplit::LongerAxis => fr.w > fr.h,
        };

        // Horizontal split: the bottom part spans the full free width and the
        // right part is only as tall as the placed slot.
        let mut bottom = Rect::new(fr.x, placed.bottom(), 0, h_bottom);
        let mut right = Rect::new(placed.right(), fr.y, w_right, 0);
        if split_horizontal {
            bottom.w = fr.w;
            right.h = placed.h;
        } else {
            bottom.w = placed.w;
            right.h = fr.h;
        }
        let keep = |r: Rect| (r.w > 0 && r.h > 0).then_some(r);
        (keep(bottom), keep(right))
    }

    fn prune_free_list(&mut self) {
        let mut i = 0;
        while i < self.free.len() {
            let a = self.free[i];
            let mut remove_i = false;
            let mut j = i + 1;
            while j < self.free.len() {
                let b = self.free[j];
                if b.contains(&a) {
                    remove_i = true;
                    break;
                }
                if a.contains(&b) {
                    self.free.remove(j);
                    continue;
                }
                j += 1;
            }
            if remove_i {
                self.free.remove(i);
            } else {
                i += 1;
            }
        }
    }
}
