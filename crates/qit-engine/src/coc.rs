use ndarray::Array2;
use qit_core::centers::center_of_charge;
use qit_core::error::QitResult;
use qit_core::filter::SpeciesSelector;
use qit_core::trajectory::Trajectory;

use crate::frames::FrameSequence;

/// Center of charge of two species and of the whole cloud over a set of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesCenters {
    pub times: Vec<f64>,
    pub coc_a: Array2<f64>,
    pub coc_b: Array2<f64>,
    pub coc_all: Array2<f64>,
}

/// Centers of charge for `species_a`, `species_b` and all particles.
///
/// `steps` restricts the computation to the listed steps, in order; `None`
/// uses the whole trajectory.
pub fn species_centers_of_charge(
    trajectory: &Trajectory,
    species_a: &SpeciesSelector,
    species_b: &SpeciesSelector,
    steps: Option<&[usize]>,
) -> QitResult<SpeciesCenters> {
    let windowed;
    let trajectory = match steps {
        Some(steps) => {
            windowed = trajectory.select_steps(steps)?;
            &windowed
        }
        None => trajectory,
    };
    Ok(SpeciesCenters {
        times: trajectory.times().to_vec(),
        coc_a: center_of_charge(&species_a.select_positions(trajectory)?),
        coc_b: center_of_charge(&species_b.select_positions(trajectory)?),
        coc_all: center_of_charge(trajectory.positions()),
    })
}

/// Trailing center-of-charge traces of two species, one window per frame.
pub struct CocTraceAnimation<'a> {
    trajectory: &'a Trajectory,
    species: [SpeciesSelector; 2],
    frames: FrameSequence,
    frame_len: usize,
}

impl<'a> CocTraceAnimation<'a> {
    pub fn new(
        trajectory: &'a Trajectory,
        species: [SpeciesSelector; 2],
        frames: FrameSequence,
        frame_len: usize,
    ) -> QitResult<Self> {
        frames.validate_windows(trajectory.len(), frame_len)?;
        Ok(Self {
            trajectory,
            species,
            frames,
            frame_len,
        })
    }

    pub fn n_frames(&self) -> usize {
        self.frames.n_frames
    }

    pub fn frame(&self, frame: usize) -> QitResult<SpeciesCenters> {
        self.frames.check_frame(frame)?;
        let steps: Vec<usize> = self.frames.window(frame, self.frame_len).collect();
        let [a, b] = &self.species;
        species_centers_of_charge(self.trajectory, a, b, Some(&steps))
    }

    pub fn frames(&self) -> impl Iterator<Item = QitResult<SpeciesCenters>> + '_ {
        (0..self.frames.n_frames).map(move |i| self.frame(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use qit_core::error::QitError;
    use qit_core::trajectory::StepArrays;

    // Two species at x = +1 (mass 10) and x = -3 (mass 20), z follows the step.
    fn two_species(n_steps: usize) -> Trajectory {
        let mut pos = Array3::<f64>::zeros((4, 3, n_steps));
        for s in 0..n_steps {
            for p in 0..4 {
                pos[[p, 0, s]] = if p < 2 { 1.0 } else { -3.0 };
                pos[[p, 2, s]] = s as f64;
            }
        }
        let times = (0..n_steps).map(|s| s as f64 * 0.1).collect();
        Trajectory::new(StepArrays::Dense(pos), times)
            .expect("valid trajectory")
            .with_masses(vec![10.0, 10.0, 20.0, 20.0])
            .expect("with masses")
    }

    #[test]
    fn centers_of_each_species() {
        let tra = two_species(5);
        let c = species_centers_of_charge(
            &tra,
            &SpeciesSelector::Mass(10.0),
            &SpeciesSelector::Mass(20.0),
            Some(&[1, 3]),
        )
        .expect("species centers of charge");
        assert_eq!(c.times.len(), 2);
        assert!((c.times[1] - 0.3).abs() < 1e-12);
        assert_eq!(c.coc_a[[0, 0]], 1.0);
        assert_eq!(c.coc_b[[1, 0]], -3.0);
        assert_eq!(c.coc_all[[0, 0]], -1.0);
        assert_eq!(c.coc_all[[1, 2]], 3.0);
    }

    #[test]
    fn absent_species_gives_nan() {
        let tra = two_species(3);
        let c = species_centers_of_charge(
            &tra,
            &SpeciesSelector::Mass(10.0),
            &SpeciesSelector::Mass(99.0),
            None,
        )
        .expect("species centers of charge");
        assert!(c.coc_b.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn trace_frames_slide_by_interval() {
        let tra = two_species(10);
        let anim = CocTraceAnimation::new(
            &tra,
            [SpeciesSelector::Mass(10.0), SpeciesSelector::Mass(20.0)],
            FrameSequence::new(3, 2),
            4,
        )
        .expect("trace animation");
        let frames: Vec<_> = anim.frames().collect::<QitResult<_>>().expect("all frames");
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].coc_a.nrows(), 4);
        assert_eq!(frames[2].coc_a[[0, 2]], 4.0);
        assert!(matches!(anim.frame(3), Err(QitError::Usage(_))));

        assert!(matches!(
            CocTraceAnimation::new(
                &tra,
                [SpeciesSelector::Mass(10.0), SpeciesSelector::Mass(20.0)],
                FrameSequence::new(4, 3),
                4,
            ),
            Err(QitError::Usage(_))
        ));
    }
}
