use crate::error::{Error, Result};

/// Extent of a one-, two- or three-dimensional index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkSize {
    dims: usize,
    sizes: [usize; 3],
}

impl WorkSize {
    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.sizes[..self.dims]
    }

    /// Extent along `dim`; 1 beyond the used dimensions.
    pub fn get(&self, dim: usize) -> usize {
        if dim < self.dims {
            self.sizes[dim]
        } else {
            1
        }
    }

    pub fn total(&self) -> usize {
        self.as_slice().iter().product()
    }

    #[cfg(feature = "opencl")]
    pub(crate) fn to_spatial(self) -> ocl::SpatialDims {
        let [x, y, z] = self.sizes;
        match self.dims {
            1 => ocl::SpatialDims::One(x),
            2 => ocl::SpatialDims::Two(x, y),
            _ => ocl::SpatialDims::Three(x, y, z),
        }
    }
}

impl From<usize> for WorkSize {
    fn from(x: usize) -> Self {
        Self { dims: 1, sizes: [x, 1, 1] }
    }
}

impl From<(usize, usize)> for WorkSize {
    fn from((x, y): (usize, usize)) -> Self {
        Self { dims: 2, sizes: [x, y, 1] }
    }
}

impl From<(usize, usize, usize)> for WorkSize {
    fn from((x, y, z): (usize, usize, usize)) -> Self {
        Self { dims: 3, sizes: [x, y, z] }
    }
}

/// Global and optional local (work-group) shape of one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NdRange {
    global: WorkSize,
    local: Option<WorkSize>,
}

impl NdRange {
    pub fn new(global: impl Into<WorkSize>) -> Self {
        Self {
            global: global.into(),
            local: None,
        }
    }

    pub fn with_local(mut self, local: impl Into<WorkSize>) -> Self {
        self.local = Some(local.into());
        self
    }

    pub fn global(&self) -> WorkSize {
        self.global
    }

    pub fn local(&self) -> Option<WorkSize> {
        self.local
    }

    /// Every global extent must be non-zero, and a local shape must match
    /// its dimensionality and divide it evenly.
    pub fn validate(&self, function: &str) -> Result<()> {
        if self.global.as_slice().contains(&0) {
            return Err(Error::invalid_argument(
                function,
                format!("empty global range {:?}", self.global.as_slice()),
            ));
        }

        if let Some(local) = self.local {
            if local.dims != self.global.dims {
                return Err(Error::invalid_argument(
                    function,
                    format!(
                        "local range has {} dimensions, global has {}",
                        local.dims, self.global.dims
                    ),
                ));
            }
            let divides = self
                .global
                .as_slice()
                .iter()
                .zip(local.as_slice())
                .all(|(&g, &l)| l != 0 && g % l == 0);
            if !divides {
                return Err(Error::invalid_argument(
                    function,
                    format!(
                        "local range {:?} does not divide global range {:?}",
                        local.as_slice(),
                        self.global.as_slice()
                    ),
                ));
            }
        }

        Ok(())
    }
}

/// Smallest multiple of `multiple` that is at least `n`.
pub fn round_up(n: usize, multiple: usize) -> usize {
    if multiple == 0 {
        return n;
    }
    n.div_ceil(multiple) * multiple
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_size_dims() {
        let ws = WorkSize::from((4usize, 8usize));
        assert_eq!(ws.dims(), 2);
        assert_eq!(ws.get(1), 8);
        assert_eq!(ws.get(2), 1);
        assert_eq!(ws.total(), 32);
    }

    #[test]
    fn test_validate() {
        let square = NdRange::new((64usize, 64usize));
        assert!(square.with_local((32usize, 32usize)).validate("t").is_ok());
        assert!(square.with_local(32usize).validate("t").is_err());
        assert!(NdRange::new(0usize).validate("t").is_err());

        let ragged = NdRange::new((64usize, 60usize)).with_local((32usize, 32usize));
        assert!(ragged.validate("t").is_err());
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(0, 32), 0);
        assert_eq!(round_up(1, 32), 32);
        assert_eq!(round_up(64, 32), 64);
        assert_eq!(round_up(65, 32), 96);
    }
}
