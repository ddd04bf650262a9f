/// Find the edges to reverse so that the graph becomes acyclic
///
/// Runs a depth-first search from every unvisited vertex in index order and
/// flags the edges that point back to a vertex still on the stack. Self loops
/// must be filtered out beforehand.
pub(crate) fn back_edges(n: usize, edges: &[(usize, usize)]) -> Vec<bool> {
    let mut out: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (e, &(s, _)) in edges.iter().enumerate() {
        out[s].push(e);
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut reversed = vec![false; edges.len()];
    let mut mark = vec![Mark::New; n];
    for root in 0..n {
        if mark[root] != Mark::New {
            continue;
        }
        mark[root] = Mark::Active;
        let mut stack = vec![(root, 0usize)];
        while let Some((v, next)) = stack.last_mut() {
            let v = *v;
            let Some(&e) = out[v].get(*next) else {
                mark[v] = Mark::Done;
                stack.pop();
                continue;
            };
            *next += 1;
            let w = edges[e].1;
            match mark[w] {
                Mark::New => {
                    mark[w] = Mark::Active;
                    stack.push((w, 0));
                }
                Mark::Active => reversed[e] = true,
                Mark::Done => {}
            }
        }
    }
    reversed
}
