//! LED patterns shown on the buzzers.
//!
//! A buzzer strip holds two 8-LED score rings (indices 0..8 and 8..16)
//! followed by a logo region (16..). Ring index 0 is the bottom LED and
//! indices increase clockwise.

use buzzhub_core::{Color, LedFrame};

use crate::team::{PointLimit, Team};

/// LEDs in one score ring.
pub const RING_SIZE: usize = 8;

/// First LED of the logo region.
pub const LOGO_START: usize = 2 * RING_SIZE;

/// Activation order of the 8-point table.
const EIGHT_POINT_ORDER: [usize; RING_SIZE] = [7, 6, 0, 5, 1, 4, 2, 3];

/// Ring LEDs lit for `score` on a 5-point scale: 7, then 0 and 6, then 1
/// and 5, then 2 and 4, then 3.
pub fn fill_five(score: u32) -> [bool; RING_SIZE] {
    let mut lit = [false; RING_SIZE];
    if score >= 1 {
        lit[7] = true;
    }
    if score >= 2 {
        lit[0] = true;
        lit[6] = true;
    }
    if score >= 3 {
        lit[1] = true;
        lit[5] = true;
    }
    if score >= 4 {
        lit[2] = true;
        lit[4] = true;
    }
    if score >= 5 {
        lit[3] = true;
    }
    lit
}

/// Ring LEDs lit for `score` on an 8-point scale.
pub fn fill_eight(score: u32) -> [bool; RING_SIZE] {
    let mut lit = [false; RING_SIZE];
    for &i in EIGHT_POINT_ORDER.iter().take(score as usize) {
        lit[i] = true;
    }
    lit
}

/// Colours of one score ring.
///
/// Limits 10 and 16 run the 5 and 8 point tables twice. The second lap
/// paints lit LEDs in the secondary colour over a primary background.
pub fn calc_pattern(
    point: u32,
    limit: PointLimit,
    primary: Color,
    secondary: Color,
) -> [Color; RING_SIZE] {
    let (lit, on, off) = match limit {
        PointLimit::Five => (fill_five(point), primary, Color::BLACK),
        PointLimit::Ten if point <= 5 => (fill_five(point), primary, Color::BLACK),
        PointLimit::Ten => (fill_five(point - 5), secondary, primary),
        PointLimit::Eight => (fill_eight(point), primary, Color::BLACK),
        PointLimit::Sixteen if point <= 8 => (fill_eight(point), primary, Color::BLACK),
        PointLimit::Sixteen => (fill_eight(point - 8), secondary, primary),
    };
    lit.map(|l| if l { on } else { off })
}

/// Full strip for a team's score: the ring mirrored on both halves, then the
/// logo region in the primary colour.
pub fn render_score(team: &Team, led_count: usize) -> LedFrame {
    let ring = calc_pattern(
        team.point,
        team.point_limit,
        team.primary_color,
        team.secondary_color,
    );

    let mut frame = LedFrame::new(led_count);
    for (i, color) in ring.into_iter().enumerate() {
        frame.set(i, color);
        frame.set(i + RING_SIZE, color);
    }
    for i in LOGO_START..led_count {
        frame.set(i, team.primary_color);
    }
    frame
}

/// All white, shown while waiting for a press.
pub fn waiting_frame(led_count: usize) -> LedFrame {
    LedFrame::filled(led_count, Color::WHITE)
}

/// Red on even LEDs, green on odd ones, shown on the buzzers under review.
pub fn check_frame(led_count: usize) -> LedFrame {
    LedFrame::from_fn(led_count, |i| {
        if i % 2 == 0 {
            Color::RED
        } else {
            Color::GREEN
        }
    })
}

/// Verdict flash.
pub fn flash_frame(led_count: usize, confirmed: bool) -> LedFrame {
    LedFrame::filled(led_count, if confirmed { Color::GREEN } else { Color::RED })
}
