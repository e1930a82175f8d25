/// RGB colours (components in `[0, 1]`) used to tell neighbouring groups apart when writing grouped points
pub const GROUP_COLORS: [[f32; 3]; 12] = [
    [0.9, 0.1, 0.1],
    [0.1, 0.7, 0.1],
    [0.1, 0.3, 0.9],
    [0.9, 0.8, 0.1],
    [0.8, 0.1, 0.8],
    [0.1, 0.8, 0.8],
    [1.0, 0.5, 0.0],
    [0.5, 0.0, 1.0],
    [0.6, 0.4, 0.2],
    [0.5, 0.9, 0.5],
    [1.0, 0.6, 0.7],
    [0.4, 0.4, 0.4],
];

/// Colour for the group with id `group`, cycling through [GROUP_COLORS]
pub fn color_for_group(group: usize) -> [f32; 3] {
    GROUP_COLORS[group % GROUP_COLORS.len()]
}
