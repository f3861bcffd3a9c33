//! Tradability state machine
//!
//! Pure transition function; the pipeline performs the I/O for each state
//! and feeds the result back in. Keeping the policy here makes the
//! fallback rules testable without any network.
//!
//! ```text
//! Start     --bonding-->            Done(Tradable BONDING)
//! Start     --graduated/unknown-->  PoolCheck
//! PoolCheck --tradable-->           SwapCheck
//! PoolCheck --infra + trusted-->    Done(Tradable LP_LIVE, unverified)
//! PoolCheck --infra, untrusted-->   Done(Discarded, waiting)
//! PoolCheck --otherwise-->          Done(Discarded)
//! SwapCheck --routable-->           Enrich
//! SwapCheck --unavailable-->        Done(Discarded, waiting)
//! SwapCheck --no route-->           Done(Discarded)
//! Enrich    --any-->                Done(Tradable LISTED | INDEXING | LP_LIVE)
//! ```

use super::types::{Enrichment, PoolCheck, PoolRecord, RouteProbe, Verdict, Verification};
use crate::candidate::TokenStage;
use crate::pump::CurveStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum State {
    Start,
    PoolCheck,
    SwapCheck {
        pool: PoolRecord,
        liquidity_sol: f64,
    },
    Enrich {
        pool: PoolRecord,
        liquidity_sol: f64,
    },
    Done(Verdict),
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::Start => "START",
            State::PoolCheck => "POOL_CHECK",
            State::SwapCheck { .. } => "SWAP_CHECK",
            State::Enrich { .. } => "ENRICH",
            State::Done(_) => "DONE",
        }
    }
}

/// Result of the I/O performed for a state
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Curve lookup; `Err` carries the failure reason
    Curve(Result<CurveStatus, String>),
    Pool(PoolCheck),
    Route(RouteProbe),
    Enriched(Enrichment),
}

/// Per-check facts the transition needs besides the input
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// Candidate is eligible for the trust fallback
    pub trusted: bool,
    /// Scanner's liquidity estimate, reported on trust-fallback verdicts
    pub candidate_liquidity_sol: f64,
}

pub fn transition(state: State, input: Input, ctx: &Context) -> State {
    match (state, input) {
        (State::Start, Input::Curve(Ok(CurveStatus::Bonding { progress_pct, .. }))) => {
            State::Done(Verdict::Tradable {
                stage: TokenStage::Bonding,
                verification: Verification::BondingCurve,
                pool_address: None,
                liquidity_sol: None,
                pair: None,
                reason: format!("on bonding curve ({:.1}% complete)", progress_pct),
            })
        }
        // Graduated, no curve, or curve lookup failed: the AMM is authoritative
        (State::Start, Input::Curve(_)) => State::PoolCheck,

        (State::PoolCheck, Input::Pool(PoolCheck::Tradable { pool, liquidity_sol })) => {
            State::SwapCheck {
                pool,
                liquidity_sol,
            }
        }
        (State::PoolCheck, Input::Pool(check)) if check.is_infrastructure_failure() && ctx.trusted => {
            State::Done(Verdict::Tradable {
                stage: TokenStage::LpLive,
                verification: Verification::UnverifiedTrustedSource,
                pool_address: None,
                liquidity_sol: Some(ctx.candidate_liquidity_sol),
                pair: None,
                reason: format!("unverified - trusted source ({})", check.reason()),
            })
        }
        // Outages are not answers: only checklist failures are final
        (State::PoolCheck, Input::Pool(check)) => State::Done(Verdict::Discarded {
            waiting: matches!(check, PoolCheck::Waiting { .. }) || check.is_infrastructure_failure(),
            reason: check.reason(),
        }),

        (State::SwapCheck { pool, liquidity_sol }, Input::Route(probe)) => {
            if probe.is_routable() {
                State::Enrich {
                    pool,
                    liquidity_sol,
                }
            } else {
                State::Done(Verdict::Discarded {
                    waiting: matches!(probe, RouteProbe::Unavailable { .. }),
                    reason: probe.reason(),
                })
            }
        }

        (State::Enrich { pool, liquidity_sol }, Input::Enriched(enrichment)) => {
            let stage = enrichment.stage();
            let reason = match &enrichment {
                Enrichment::Found(_) => "pool verified, pair listed".to_string(),
                Enrichment::NotIndexed {
                    retry_in_secs: Some(secs),
                    ..
                } => format!("pool verified, indexer retry in {}s", secs),
                _ => "pool verified".to_string(),
            };
            State::Done(Verdict::Tradable {
                stage,
                verification: Verification::Verified,
                pool_address: Some(pool.address),
                liquidity_sol: Some(liquidity_sol),
                pair: enrichment.pair().cloned(),
                reason,
            })
        }

        (done @ State::Done(_), _) => done,
        (state, input) => State::Done(Verdict::Discarded {
            waiting: false,
            reason: format!("unexpected {} input in state {}", input_name(&input), state.name()),
        }),
    }
}

fn input_name(input: &Input) -> &'static str {
    match input {
        Input::Curve(_) => "curve",
        Input::Pool(_) => "pool",
        Input::Route(_) => "route",
        Input::Enriched(_) => "enrichment",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tradability::pool_validator::fixtures::sol_pool;
    use crate::tradability::types::{PairInfo, PoolRejection};

    fn ctx(trusted: bool) -> Context {
        Context {
            trusted,
            candidate_liquidity_sol: 80.0,
        }
    }

    fn routable() -> RouteProbe {
        RouteProbe::Routable {
            venue: "jupiter".into(),
            out_amount: 10,
            price_impact_pct: None,
        }
    }

    fn infra() -> PoolCheck {
        PoolCheck::Discarded {
            pool_address: None,
            reason: PoolRejection::Infrastructure {
                detail: "502".into(),
            },
        }
    }

    fn run(inputs: Vec<Input>, ctx: &Context) -> State {
        inputs
            .into_iter()
            .fold(State::Start, |state, input| transition(state, input, ctx))
    }

    #[test]
    fn test_bonding_short_circuits() {
        let state = transition(
            State::Start,
            Input::Curve(Ok(CurveStatus::Bonding {
                progress_pct: 42.0,
                price_sol: 0.0000001,
            })),
            &ctx(false),
        );
        match state {
            State::Done(verdict) => {
                assert_eq!(verdict.stage(), Some(TokenStage::Bonding));
                assert!(verdict.is_verified());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_full_happy_path_listed() {
        let pool = sol_pool("PoolA", "MintX", 50.0);
        let state = run(
            vec![
                Input::Curve(Ok(CurveStatus::Graduated)),
                Input::Pool(PoolCheck::Tradable {
                    pool,
                    liquidity_sol: 50.0,
                }),
                Input::Route(routable()),
                Input::Enriched(Enrichment::Found(PairInfo {
                    pair_address: "PoolA".into(),
                    dex_id: "raydium".into(),
                    price_usd: Some(0.1),
                    volume_24h: None,
                    liquidity_usd: None,
                })),
            ],
            &ctx(false),
        );
        match state {
            State::Done(Verdict::Tradable {
                stage,
                verification,
                pool_address,
                pair,
                ..
            }) => {
                assert_eq!(stage, TokenStage::Listed);
                assert_eq!(verification, Verification::Verified);
                assert_eq!(pool_address.as_deref(), Some("PoolA"));
                assert!(pair.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_enrichment_failure_still_tradable() {
        let state = run(
            vec![
                Input::Curve(Err("rpc down".into())),
                Input::Pool(PoolCheck::Tradable {
                    pool: sol_pool("PoolA", "MintX", 50.0),
                    liquidity_sol: 50.0,
                }),
                Input::Route(routable()),
                Input::Enriched(Enrichment::Unavailable {
                    reason: "timeout".into(),
                }),
            ],
            &ctx(false),
        );
        match state {
            State::Done(verdict) => {
                assert!(verdict.is_tradable());
                assert_eq!(verdict.stage(), Some(TokenStage::LpLive));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_no_route_discards() {
        let state = run(
            vec![
                Input::Curve(Ok(CurveStatus::NotFound)),
                Input::Pool(PoolCheck::Tradable {
                    pool: sol_pool("PoolA", "MintX", 50.0),
                    liquidity_sol: 50.0,
                }),
                Input::Route(RouteProbe::NoRoute {
                    reason: "jupiter: no route".into(),
                }),
            ],
            &ctx(true),
        );
        match state {
            State::Done(Verdict::Discarded { waiting, reason }) => {
                assert!(!waiting);
                assert!(reason.contains("no swap route"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_trust_fallback_only_for_infrastructure() {
        let trusted = run(
            vec![Input::Curve(Ok(CurveStatus::NotFound)), Input::Pool(infra())],
            &ctx(true),
        );
        match trusted {
            State::Done(Verdict::Tradable {
                verification,
                stage,
                reason,
                liquidity_sol,
                ..
            }) => {
                assert_eq!(verification, Verification::UnverifiedTrustedSource);
                assert_eq!(stage, TokenStage::LpLive);
                assert_eq!(liquidity_sol, Some(80.0));
                assert!(reason.starts_with("unverified"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let untrusted = run(
            vec![Input::Curve(Ok(CurveStatus::NotFound)), Input::Pool(infra())],
            &ctx(false),
        );
        assert!(matches!(
            untrusted,
            State::Done(Verdict::Discarded { waiting: true, .. })
        ));

        // A real "no pool" answer is never overridden by trust
        let no_pool = run(
            vec![
                Input::Curve(Ok(CurveStatus::NotFound)),
                Input::Pool(PoolCheck::Discarded {
                    pool_address: None,
                    reason: PoolRejection::NoPools,
                }),
            ],
            &ctx(true),
        );
        assert!(matches!(
            no_pool,
            State::Done(Verdict::Discarded { waiting: false, .. })
        ));
    }

    #[test]
    fn test_backends_down_is_waiting_not_final() {
        let state = run(
            vec![
                Input::Curve(Ok(CurveStatus::Graduated)),
                Input::Pool(PoolCheck::Tradable {
                    pool: sol_pool("PoolA", "MintX", 50.0),
                    liquidity_sol: 50.0,
                }),
                Input::Route(RouteProbe::Unavailable {
                    reason: "jupiter 503; raydium 503".into(),
                }),
            ],
            &ctx(false),
        );
        match state {
            State::Done(Verdict::Discarded { waiting, reason }) => {
                assert!(waiting);
                assert!(reason.contains("503"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_registry_outage_untrusted_is_waiting() {
        let state = transition(State::PoolCheck, Input::Pool(infra()), &ctx(false));
        match state {
            State::Done(Verdict::Discarded { waiting, reason }) => {
                assert!(waiting);
                assert!(reason.contains("502"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_waiting_pool_is_discarded_as_waiting() {
        let state = run(
            vec![
                Input::Curve(Ok(CurveStatus::Graduated)),
                Input::Pool(PoolCheck::Waiting {
                    pool_address: "PoolA".into(),
                    reason: PoolRejection::EmptyVault,
                }),
            ],
            &ctx(false),
        );
        assert!(matches!(
            state,
            State::Done(Verdict::Discarded { waiting: true, .. })
        ));
    }

    #[test]
    fn test_unexpected_input_terminates() {
        let state = transition(State::Start, Input::Route(routable()), &ctx(false));
        assert!(matches!(state, State::Done(Verdict::Discarded { .. })));
    }
}
