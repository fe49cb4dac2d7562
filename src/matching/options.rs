use chrono::Duration;

/// Configuration of the skewness correction
///
#[derive(Debug, Clone)]
pub struct SkewOptions {
    samples_start: usize,
    samples_end: usize,
    sanity_threshold: Duration,
    crossing_end_slack: Duration,
}

impl Default for SkewOptions {
    fn default() -> Self {
        Self {
            samples_start: 5,
            samples_end: 5,
            sanity_threshold: Duration::seconds(10),
            crossing_end_slack: Duration::seconds(2),
        }
    }
}

impl SkewOptions {
    /// How many observations and crossings are sampled from the start of every
    /// period-direction combination.
    ///
    pub fn samples_start(mut self, n: usize) -> Self {
        assert!(n > 0, "At least one sample is required at the start");
        self.samples_start = n;
        self
    }

    /// How many observations and crossings are sampled from the end of every
    /// period-direction combination.
    ///
    pub fn samples_end(mut self, n: usize) -> Self {
        assert!(n > 0, "At least one sample is required at the end");
        self.samples_end = n;
        self
    }

    /// Sample pairs differing by this much or more are considered mismatched and do
    /// not contribute to the constant factor.
    ///
    pub fn sanity_threshold(mut self, d: Duration) -> Self {
        assert!(d > Duration::zero(), "Sanity threshold must be positive");
        self.sanity_threshold = d;
        self
    }

    /// Crossings are sampled until `period.end + slack`, as the cameras keep
    /// recording a little after the observer stops.
    ///
    pub fn crossing_end_slack(mut self, d: Duration) -> Self {
        assert!(d >= Duration::zero(), "Slack must not be negative");
        self.crossing_end_slack = d;
        self
    }

    pub fn get_samples_start(&self) -> usize {
        self.samples_start
    }

    pub fn get_samples_end(&self) -> usize {
        self.samples_end
    }

    pub fn get_sanity_threshold(&self) -> Duration {
        self.sanity_threshold
    }

    pub fn get_crossing_end_slack(&self) -> Duration {
        self.crossing_end_slack
    }
}

/// Configuration of the whole matching pipeline
///
#[derive(Debug, Clone)]
pub struct MatchingOptions {
    skew: SkewOptions,
    assignment_threshold: Duration,
    uncertain_tolerance: Duration,
    nearest_tolerance: Duration,
    duplicate_tolerance: Duration,
    include_pedestrians: bool,
    reorder_relative_positions: bool,
    relative_position_window: Duration,
    front_placeholder_offset: f64,
    back_placeholder_offset: f64,
}

impl Default for MatchingOptions {
    fn default() -> Self {
        Self {
            skew: SkewOptions::default(),
            assignment_threshold: Duration::seconds(2),
            uncertain_tolerance: Duration::seconds(1),
            nearest_tolerance: Duration::seconds(1),
            duplicate_tolerance: Duration::milliseconds(1500),
            include_pedestrians: false,
            reorder_relative_positions: true,
            relative_position_window: Duration::seconds(1),
            front_placeholder_offset: 0.6,
            back_placeholder_offset: 1.6,
        }
    }
}

impl MatchingOptions {
    pub fn skew(mut self, skew: SkewOptions) -> Self {
        self.skew = skew;
        self
    }

    /// Maximal distance between an observation and a crossing for the pair to be an
    /// edge of the assignment graph.
    ///
    pub fn assignment_threshold(mut self, d: Duration) -> Self {
        assert!(d > Duration::zero(), "Threshold must be positive");
        self.assignment_threshold = d;
        self
    }

    /// How far before a simultaneous crossing the observation with the same relative
    /// position may be.
    ///
    pub fn uncertain_tolerance(mut self, d: Duration) -> Self {
        assert!(d >= Duration::zero(), "Tolerance must not be negative");
        self.uncertain_tolerance = d;
        self
    }

    /// Tolerance of the nearest-crossing strategy
    ///
    pub fn nearest_tolerance(mut self, d: Duration) -> Self {
        assert!(d >= Duration::zero(), "Tolerance must not be negative");
        self.nearest_tolerance = d;
        self
    }

    /// Tolerance used when duplicated matches are matched again
    ///
    pub fn duplicate_tolerance(mut self, d: Duration) -> Self {
        assert!(d >= Duration::zero(), "Tolerance must not be negative");
        self.duplicate_tolerance = d;
        self
    }

    pub fn include_pedestrians(mut self, include: bool) -> Self {
        self.include_pedestrians = include;
        self
    }

    pub fn reorder_relative_positions(mut self, reorder: bool) -> Self {
        self.reorder_relative_positions = reorder;
        self
    }

    pub fn relative_position_window(mut self, d: Duration) -> Self {
        assert!(d > Duration::zero(), "Window must be positive");
        self.relative_position_window = d;
        self
    }

    /// Lateral offsets assumed for unmatched rows while reordering
    ///
    pub fn placeholder_offsets(mut self, front: f64, back: f64) -> Self {
        assert!(front < back, "The front placeholder must be closer to the edge");
        self.front_placeholder_offset = front;
        self.back_placeholder_offset = back;
        self
    }

    pub fn get_skew(&self) -> &SkewOptions {
        &self.skew
    }

    pub fn get_assignment_threshold(&self) -> Duration {
        self.assignment_threshold
    }

    pub fn get_uncertain_tolerance(&self) -> Duration {
        self.uncertain_tolerance
    }

    pub fn get_nearest_tolerance(&self) -> Duration {
        self.nearest_tolerance
    }

    pub fn get_duplicate_tolerance(&self) -> Duration {
        self.duplicate_tolerance
    }

    pub fn get_include_pedestrians(&self) -> bool {
        self.include_pedestrians
    }

    pub fn get_reorder_relative_positions(&self) -> bool {
        self.reorder_relative_positions
    }

    pub fn get_relative_position_window(&self) -> Duration {
        self.relative_position_window
    }

    pub fn get_placeholder_offsets(&self) -> (f64, f64) {
        (self.front_placeholder_offset, self.back_placeholder_offset)
    }
}
