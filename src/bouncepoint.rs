use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn step(self) -> isize {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }

    fn reversed(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// A marker bouncing back and forth along the strip, one per running build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BouncePoint {
    position: usize,
    direction: Direction,
}

impl BouncePoint {
    #[cfg(test)]
    pub fn new(position: usize, direction: Direction) -> BouncePoint {
        BouncePoint {
            position,
            direction,
        }
    }

    /// Places a point anywhere on a strip of `strip_length` LEDs, heading either way.
    pub fn random<R: Rng>(rng: &mut R, strip_length: usize) -> BouncePoint {
        let direction = if rng.gen_bool(0.5) {
            Direction::Forward
        } else {
            Direction::Backward
        };

        BouncePoint {
            position: rng.gen_range(0..strip_length.max(1)),
            direction,
        }
    }

    #[cfg(test)]
    pub fn position(&self) -> usize {
        self.position
    }

    #[cfg(test)]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Moves one LED and reflects off either end of the strip.
    pub fn advance(&mut self, strip_length: usize) -> usize {
        if strip_length <= 1 {
            self.position = 0;
            self.direction = self.direction.reversed();
            return self.position;
        }

        let last = strip_length as isize - 1;
        let mut next = self.position as isize + self.direction.step();
        if next < 0 {
            next = -next;
            self.direction = self.direction.reversed();
        } else if next > last {
            next = 2 * last - next;
            self.direction = self.direction.reversed();
        }

        // Only reachable if the point was created for a longer strip.
        self.position = next.clamp(0, last) as usize;
        self.position
    }
}
