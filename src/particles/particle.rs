use crate::utils::TreeError;

/// A single SPH particle as seen by the neighbour index and the density solver.
///
/// The index only reads `position`, `mass`, `h`, `u` and `active`. The gather outputs
/// (`rho`, `invrho`, `invh`, `hfactor`, `invomega`) are written by the density solver for
/// the particle being updated and by nobody else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphParticle<const D: usize> {
    /// Position in `D` dimensions.
    pub position: [f64; D],
    pub velocity: [f64; D],
    pub mass: f64,
    /// Smoothing length.
    pub h: f64,
    /// Specific internal energy.
    pub u: f64,
    /// Whether the particle is updated on the current step.
    pub active: bool,
    pub rho: f64,
    pub invrho: f64,
    pub invh: f64,
    /// `1/h^D`, the kernel normalisation for this particle.
    pub hfactor: f64,
    /// Grad-h correction term `1/Ω`.
    pub invomega: f64,
    pub div_v: f64,
}

impl<const D: usize> SphParticle<D> {
    /// Creates an active particle at rest.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is not finite, the mass is negative or the
    /// smoothing length is not positive.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_sph_tree::particles::SphParticle;
    ///
    /// let p = SphParticle::new([0.0, 1.0], 2.0, 0.1).expect("valid particle");
    /// assert!(p.active);
    /// assert_eq!(p.invh, 10.0);
    ///
    /// assert!(SphParticle::new([f64::NAN, 0.0], 1.0, 0.1).is_err());
    /// ```
    pub fn new(position: [f64; D], mass: f64, h: f64) -> Result<Self, TreeError> {
        let particle = Self {
            position,
            velocity: [0.0; D],
            mass,
            h,
            u: 0.0,
            active: true,
            rho: 0.0,
            invrho: 0.0,
            invh: if h > 0.0 { 1.0 / h } else { 0.0 },
            hfactor: 0.0,
            invomega: 1.0,
            div_v: 0.0,
        };
        particle.validate(0)?;
        Ok(particle)
    }

    /// Sets the specific internal energy, builder style.
    pub fn with_energy(mut self, u: f64) -> Self {
        self.u = u;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Checks the fields the index depends on. `index` is only used to label the error.
    pub fn validate(&self, index: usize) -> Result<(), TreeError> {
        if let Some(axis) = (0..D).find(|&k| !self.position[k].is_finite()) {
            return Err(TreeError::NonFiniteCoordinate { particle: index, axis });
        }
        if !(self.mass >= 0.0) || !self.mass.is_finite() {
            return Err(TreeError::InvalidParticle { particle: index, reason: "mass must be non-negative".to_string() });
        }
        if !(self.h > 0.0) || !self.h.is_finite() {
            return Err(TreeError::InvalidParticle { particle: index, reason: "smoothing length must be positive".to_string() });
        }
        Ok(())
    }
}
