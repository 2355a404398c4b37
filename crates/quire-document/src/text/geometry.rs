// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Map rectangles from a page's unrotated space into its displayed rotation.

use quire_core::types::{PageSize, Rect, Rotation};

/// Map `rect`, measured on the unrotated page of `unrotated` size, onto the
/// page as displayed after a clockwise `rotation`.
pub fn rotate_rect(rect: Rect, rotation: Rotation, unrotated: PageSize) -> Rect {
    let (w, h) = (unrotated.width_pt, unrotated.height_pt);
    match rotation {
        Rotation::Deg0 => rect,
        Rotation::Deg90 => Rect::new(h - (rect.y + rect.height), rect.x, rect.height, rect.width),
        Rotation::Deg180 => Rect::new(
            w - (rect.x + rect.width),
            h - (rect.y + rect.height),
            rect.width,
            rect.height,
        ),
        Rotation::Deg270 => Rect::new(rect.y, w - (rect.x + rect.width), rect.height, rect.width),
    }
}
