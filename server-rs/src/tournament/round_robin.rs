use std::collections::VecDeque;

/// Every pairing of `teams`, grouped into rounds with the circle method.
///
/// An odd team count gets a bye, so each round has one team sitting out. The first team stays
/// fixed while the rest rotate one place per round. Pairings with the bye are left out.
pub fn circle_rounds<T: Copy>(teams: &[T]) -> Vec<Vec<(T, T)>> {
    if teams.len() < 2 {
        return vec![];
    }

    let mut slots: Vec<Option<T>> = teams.iter().copied().map(Some).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }
    let n = slots.len();

    (0..n - 1)
        .map(|_| {
            let round = (0..n / 2)
                .filter_map(|i| match (slots[i], slots[n - 1 - i]) {
                    (Some(home), Some(away)) => Some((home, away)),
                    _ => None,
                })
                .collect();
            slots[1..].rotate_right(1);
            round
        })
        .collect()
}

/// The pairings of a poule in the order they should be played, taken one per scheduling pass
pub fn pairing_queue<T: Copy>(teams: &[T]) -> VecDeque<(T, T)> {
    circle_rounds(teams).into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn unordered(pairs: &[(i32, i32)]) -> HashSet<(i32, i32)> {
        pairs
            .iter()
            .map(|&(a, b)| (a.min(b), a.max(b)))
            .collect()
    }

    #[test]
    fn every_pair_once_even() {
        for n in [2, 4, 6, 8] {
            let teams: Vec<i32> = (1..=n).collect();
            let rounds = circle_rounds(&teams);
            assert_eq!(rounds.len() as i32, n - 1);

            let all: Vec<(i32, i32)> = rounds.iter().flatten().copied().collect();
            assert_eq!(all.len() as i32, n * (n - 1) / 2);
            assert_eq!(unordered(&all).len(), all.len());

            for round in &rounds {
                let mut seen: Vec<i32> = round.iter().flat_map(|&(a, b)| [a, b]).collect();
                seen.sort();
                assert_eq!(seen, teams);
            }
        }
    }

    #[test]
    fn every_pair_once_odd() {
        for n in [3, 5, 7] {
            let teams: Vec<i32> = (1..=n).collect();
            let rounds = circle_rounds(&teams);
            // the bye makes it n rounds
            assert_eq!(rounds.len() as i32, n);

            let all: Vec<(i32, i32)> = rounds.iter().flatten().copied().collect();
            assert_eq!(all.len() as i32, n * (n - 1) / 2);
            assert_eq!(unordered(&all).len(), all.len());

            for round in &rounds {
                assert_eq!(round.len() as i32, (n - 1) / 2);
                let seen: HashSet<i32> = round.iter().flat_map(|&(a, b)| [a, b]).collect();
                assert_eq!(seen.len() as i32, n - 1);
            }
        }
    }

    #[test]
    fn first_round_order() {
        assert_eq!(
            circle_rounds(&['a', 'b', 'c', 'd']),
            vec![
                vec![('a', 'd'), ('b', 'c')],
                vec![('a', 'c'), ('d', 'b')],
                vec![('a', 'b'), ('c', 'd')],
            ]
        );
    }

    #[test]
    fn too_small() {
        assert!(circle_rounds::<i32>(&[]).is_empty());
        assert!(circle_rounds(&[1]).is_empty());
        assert_eq!(pairing_queue(&[1, 2]), VecDeque::from(vec![(1, 2)]));
    }
}
