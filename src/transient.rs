/// Finds local maxima of a filtered frame that rise above a floor.
///
/// A flat-topped peak is reported once, at the middle of its plateau. The
/// first and last samples are never peaks because they lack a neighbour.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransientDetector;

impl TransientDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, input: &[f64], floor: f64) -> Vec<usize> {
        let mut peaks = Vec::new();
        if input.len() < 3 {
            return peaks;
        }
        let last = input.len() - 1;
        let mut i = 1;
        while i < last {
            if input[i - 1] < input[i] {
                let mut ahead = i + 1;
                while ahead < last && input[ahead] == input[i] {
                    ahead += 1;
                }
                if input[ahead] < input[i] {
                    if input[i] > floor {
                        peaks.push((i + ahead - 1) / 2);
                    }
                    i = ahead;
                    continue;
                }
            }
            i += 1;
        }
        peaks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_local_maxima_above_floor() {
        let d = TransientDetector::new();
        let signal = [0.0, 5.0, 1.0, 9.0, 2.0, 3.0, 0.0];
        assert_eq!(d.detect(&signal, 0.0), vec![1, 3, 5]);
        assert_eq!(d.detect(&signal, 4.0), vec![1, 3]);
        assert_eq!(d.detect(&signal, 9.0), Vec::<usize>::new());
    }

    #[test]
    fn test_edges_are_not_peaks() {
        let d = TransientDetector::new();
        assert!(d.detect(&[10.0, 1.0, 0.0, 1.0, 10.0], 0.5).is_empty());
        assert!(d.detect(&[10.0, 1.0], 0.0).is_empty());
        assert!(d.detect(&[], 0.0).is_empty());
    }

    #[test]
    fn test_plateau_reports_midpoint() {
        let d = TransientDetector::new();
        assert_eq!(d.detect(&[0.0, 4.0, 4.0, 4.0, 1.0], 1.0), vec![2]);
        assert_eq!(d.detect(&[0.0, 4.0, 4.0, 1.0], 1.0), vec![1]);
        // rising plateau is not a peak
        assert!(d.detect(&[0.0, 4.0, 4.0, 6.0], 1.0).is_empty());
    }

    #[test]
    fn test_negative_swings_ignored() {
        let d = TransientDetector::new();
        let signal = [0.0, -8000.0, 0.0, 200.0, 0.0];
        assert!(d.detect(&signal, 1000.0).is_empty());
        assert_eq!(d.detect(&signal, 100.0), vec![3]);
    }
}
