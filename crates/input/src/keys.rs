use glam::Vec3;

/// Movement keys understood by the camera, independent of the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKey {
    /// W
    Forward,
    /// S
    Back,
    /// A
    Left,
    /// D
    Right,
    /// E
    Up,
    /// Q
    Down,
}

impl MoveKey {
    pub const ALL: [MoveKey; 6] = [
        MoveKey::Forward,
        MoveKey::Back,
        MoveKey::Left,
        MoveKey::Right,
        MoveKey::Up,
        MoveKey::Down,
    ];

    /// Unit direction in camera-local space (x right, y forward, z up).
    pub fn direction(self) -> Vec3 {
        match self {
            MoveKey::Forward => Vec3::Y,
            MoveKey::Back => Vec3::NEG_Y,
            MoveKey::Left => Vec3::NEG_X,
            MoveKey::Right => Vec3::X,
            MoveKey::Up => Vec3::Z,
            MoveKey::Down => Vec3::NEG_Z,
        }
    }

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Pressed/released state of the movement keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    held: u8,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: MoveKey, pressed: bool) {
        if pressed {
            self.held |= key.bit();
        } else {
            self.held &= !key.bit();
        }
    }

    pub fn is_pressed(&self, key: MoveKey) -> bool {
        self.held & key.bit() != 0
    }

    pub fn any_pressed(&self) -> bool {
        self.held != 0
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held = 0;
    }

    /// Camera-local velocity: `speed` along each held key's direction.
    /// Opposing keys cancel.
    pub fn velocity(&self, speed: f32) -> Vec3 {
        MoveKey::ALL
            .iter()
            .filter(|k| self.is_pressed(**k))
            .map(|k| k.direction() * speed)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_held_is_still() {
        let input = InputState::new();
        assert!(!input.any_pressed());
        assert_eq!(input.velocity(5.0), Vec3::ZERO);
    }

    #[test]
    fn press_and_release() {
        let mut input = InputState::new();
        input.set(MoveKey::Forward, true);
        assert!(input.is_pressed(MoveKey::Forward));
        assert!(!input.is_pressed(MoveKey::Back));
        input.set(MoveKey::Forward, false);
        assert!(!input.any_pressed());
    }

    #[test]
    fn velocity_combines_keys() {
        let mut input = InputState::new();
        input.set(MoveKey::Forward, true);
        input.set(MoveKey::Right, true);
        input.set(MoveKey::Up, true);
        assert_eq!(input.velocity(5.0), Vec3::new(5.0, 5.0, 5.0));

        input.set(MoveKey::Back, true);
        assert_eq!(input.velocity(5.0), Vec3::new(5.0, 0.0, 5.0));
    }

    #[test]
    fn clear_releases_all() {
        let mut input = InputState::new();
        for key in MoveKey::ALL {
            input.set(key, true);
        }
        assert_eq!(input.velocity(1.0), Vec3::ZERO);
        input.clear();
        assert!(!input.any_pressed());
    }
}
