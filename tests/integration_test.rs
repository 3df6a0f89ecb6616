//! End-to-end tests for signal generation, the backtest engine and metrics.

mod common;

use approx::assert_relative_eq;
use common::*;
use proptest::prelude::*;
use trendedge::domain::backtest::{run_backtest, run_backtest_raw};
use trendedge::domain::coerce::{SeriesInput, Table};
use trendedge::domain::error::TrendEdgeError;
use trendedge::domain::indicator::simple_moving_average;
use trendedge::domain::metrics::{cagr, max_drawdown, sharpe, BacktestConfig, Metrics};
use trendedge::domain::params::BacktestParams;
use trendedge::domain::pipeline::run_pipeline;
use trendedge::domain::series::{Position, PriceSeries, TimeSeries};
use trendedge::domain::signal::generate_signal;

const CROSSOVER: [f64; 5] = [100.0, 110.0, 99.0, 99.0, 120.0];

fn positions(signal: &[Position]) -> Vec<i32> {
    signal.iter().map(|p| p.as_i32()).collect()
}

mod crossover_scenario {
    use super::*;

    #[test]
    fn moving_averages_match_hand_computation() {
        let prices = make_prices(&CROSSOVER);

        let fast = simple_moving_average(&prices, 2);
        let slow = simple_moving_average(&prices, 3);

        assert_eq!(fast.values()[0], None);
        assert_relative_eq!(fast.values()[1].unwrap(), 105.0);
        assert_relative_eq!(fast.values()[2].unwrap(), 104.5);
        assert_relative_eq!(fast.values()[3].unwrap(), 99.0);
        assert_relative_eq!(fast.values()[4].unwrap(), 109.5);

        assert_eq!(slow.values()[..2], [None, None]);
        assert_relative_eq!(slow.values()[2].unwrap(), 103.0);
        assert_relative_eq!(slow.values()[3].unwrap(), 308.0 / 3.0);
        assert_relative_eq!(slow.values()[4].unwrap(), 106.0);
    }

    #[test]
    fn signal_follows_fast_above_slow() {
        let prices = make_prices(&CROSSOVER);
        let signal = generate_signal(&prices, 2, 3);
        assert_eq!(positions(signal.values()), vec![0, 0, 1, 0, 1]);
    }

    #[test]
    fn buyhold_returns_and_equity() {
        let prices = make_prices(&CROSSOVER);
        let signal = generate_signal(&prices, 2, 3);
        let table = run_backtest(&prices, &signal);

        let expected = [0.0, 0.1, -0.1, 0.0, 21.0 / 99.0];
        for (got, want) in table.buyhold_returns().iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
        assert_relative_eq!(*table.buyhold_equity().last().unwrap(), 1.2, epsilon = 1e-12);
    }

    #[test]
    fn strategy_executes_next_day() {
        let prices = make_prices(&CROSSOVER);
        let signal = generate_signal(&prices, 2, 3);
        let table = run_backtest(&prices, &signal);

        let held: Vec<i32> = table.rows.iter().map(|r| r.held.as_i32()).collect();
        assert_eq!(held, vec![0, 0, 0, 1, 0]);

        let mut equity = 1.0;
        for row in &table.rows {
            equity *= 1.0 + row.ret_buyhold * row.held.as_f64();
            assert_relative_eq!(row.eq_strategy, equity, epsilon = 1e-12);
        }
        // Long only across the unchanged 99 -> 99 day.
        assert_relative_eq!(*table.strategy_equity().last().unwrap(), 1.0);
    }
}

mod backtest_engine {
    use super::*;

    #[test]
    fn flat_signal_keeps_equity_at_one() {
        let prices = wavy_prices(60);
        let signal = prices.map(|_| Position::Flat);
        let table = run_backtest(&prices, &signal);

        assert!(table.strategy_equity().iter().all(|&e| e == 1.0));
        assert!(table.strategy_returns().iter().all(|&r| r == 0.0));
    }

    #[test]
    fn always_long_tracks_buyhold() {
        let prices = wavy_prices(60);
        let signal = prices.map(|_| Position::Long);
        let table = run_backtest(&prices, &signal);

        for row in &table.rows {
            assert_relative_eq!(row.eq_strategy, row.eq_buyhold, epsilon = 1e-12);
        }
        let first = prices.values()[0];
        let last = *prices.values().last().unwrap();
        assert_relative_eq!(
            *table.buyhold_equity().last().unwrap(),
            last / first,
            epsilon = 1e-12
        );
    }

    #[test]
    fn rerunning_is_idempotent() {
        let prices = wavy_prices(80);
        let signal = generate_signal(&prices, 5, 20);

        let first = run_backtest(&prices, &signal);
        let second = run_backtest(&prices, &signal);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_prices_give_empty_table() {
        let prices = PriceSeries::empty();
        let table = run_backtest(&prices, &prices.map(|_| Position::Long));

        assert!(table.is_empty());
        let metrics = Metrics::compute(&table, &BacktestConfig::default());
        assert_eq!(metrics.total_return_strategy, None);
        assert_eq!(metrics.exposure, None);
    }

    #[test]
    fn missing_signal_date_is_flat() {
        let prices = make_prices(&CROSSOVER);
        let dates = make_dates(5);
        let sparse = make_signal(&[dates[0], dates[1], dates[3], dates[4]], &[1, 1, 1, 1]);

        let table = run_backtest(&prices, &sparse);
        let held: Vec<i32> = table.rows.iter().map(|r| r.held.as_i32()).collect();
        assert_eq!(held, vec![0, 1, 1, 0, 1]);

        let explicit = make_signal(&dates, &[1, 1, 0, 1, 1]);
        assert_eq!(table, run_backtest(&prices, &explicit));
    }

    #[test]
    fn extra_signal_dates_are_ignored() {
        let prices = make_prices(&CROSSOVER[..3]);
        let dates = make_dates(5);
        let long = make_signal(&dates, &[1, 1, 1, 1, 1]);

        let table = run_backtest(&prices, &long);
        assert_eq!(table.len(), 3);
        assert_eq!(table.dates(), prices.index());
    }

    #[test]
    fn short_array_signal_is_right_aligned() {
        let prices = make_prices(&CROSSOVER);
        let table =
            run_backtest_raw(SeriesInput::from(prices), SeriesInput::from(vec![1.0, 1.0])).unwrap();

        let held: Vec<i32> = table.rows.iter().map(|r| r.held.as_i32()).collect();
        assert_eq!(held, vec![0, 0, 0, 0, 1]);
        assert_relative_eq!(table.rows[4].ret_strategy, 21.0 / 99.0, epsilon = 1e-12);
    }

    #[test]
    fn table_input_uses_close_column() {
        let dates = make_dates(5);
        let table = Table::new(
            dates.clone(),
            vec![
                ("Open".to_string(), vec![1.0; 5]),
                ("Close".to_string(), CROSSOVER.to_vec()),
            ],
        )
        .unwrap();
        let signal = make_signal(&dates, &[0, 0, 1, 0, 1]);

        let result = run_backtest_raw(SeriesInput::from(table), SeriesInput::from(&signal)).unwrap();
        assert_relative_eq!(*result.buyhold_equity().last().unwrap(), 1.2, epsilon = 1e-12);
    }

    #[test]
    fn two_dimensional_signal_is_rejected() {
        let prices = make_prices(&CROSSOVER);
        let err = run_backtest_raw(
            SeriesInput::from(prices),
            SeriesInput::Matrix {
                rows: 2,
                cols: 2,
                values: vec![1.0; 4],
            },
        )
        .unwrap_err();
        assert!(matches!(err, TrendEdgeError::Shape { .. }));
    }
}

mod metrics {
    use super::*;

    #[test]
    fn cagr_recovers_constant_growth_rate() {
        let daily: f64 = 0.0004;
        let equity: Vec<f64> = (1..=504).map(|i| (1.0 + daily).powi(i)).collect();

        let got = cagr(&equity, 252).unwrap();
        assert_relative_eq!(got, (1.0 + daily).powi(252) - 1.0, epsilon = 1e-10);
    }

    #[test]
    fn sharpe_undefined_for_constant_returns() {
        assert_eq!(sharpe(&[0.01; 30], 252, 0.0), None);
        assert_eq!(sharpe(&[0.01], 252, 0.0), None);
    }

    #[test]
    fn metrics_for_flat_strategy() {
        let prices = wavy_prices(120);
        let table = run_backtest(&prices, &prices.map(|_| Position::Flat));
        let m = Metrics::compute(&table, &BacktestConfig::default());

        assert_eq!(m.total_return_strategy, Some(0.0));
        assert_eq!(m.sharpe_strategy, None);
        assert_eq!(m.max_drawdown_strategy, Some(0.0));
        assert_eq!(m.exposure, Some(0.0));
        assert!(m.sharpe_buyhold.is_some());
    }
}

mod pipeline {
    use super::*;

    #[test]
    fn runs_through_price_source() {
        let source = MockPriceSource::new().with_prices("SPY", wavy_prices(200));
        let params = BacktestParams::new("spy", 10, 30);

        let report = run_pipeline(&source, &params, &BacktestConfig::default()).unwrap();

        assert_eq!(report.params.symbol, "SPY");
        assert_eq!(report.table.len(), 200);
        assert_eq!(source.calls.get(), 1);
        assert!(report.metrics.exposure.unwrap() > 0.0);
    }

    #[test]
    fn respects_date_range() {
        let source = MockPriceSource::new().with_prices("SPY", wavy_prices(200));
        let params =
            BacktestParams::new("SPY", 5, 10).with_range(Some(date(2024, 2, 1)), Some(date(2024, 3, 31)));

        let report = run_pipeline(&source, &params, &BacktestConfig::default()).unwrap();

        assert_eq!(report.prices.first_date(), Some(date(2024, 2, 1)));
        assert_eq!(report.prices.last_date(), Some(date(2024, 3, 31)));
    }

    #[test]
    fn invalid_params_skip_fetch() {
        let source = MockPriceSource::new().with_prices("SPY", wavy_prices(200));
        let params = BacktestParams::new("SPY", 50, 20);

        let err = run_pipeline(&source, &params, &BacktestConfig::default()).unwrap_err();

        assert!(matches!(err, TrendEdgeError::InvalidParameters { .. }));
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn unknown_symbol_is_no_data() {
        let source = MockPriceSource::new();
        let params = BacktestParams::new("XYZ", 5, 10);

        let err = run_pipeline(&source, &params, &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, TrendEdgeError::NoData { .. }));
    }

    #[test]
    fn source_failure_is_no_data() {
        let source = MockPriceSource::new().with_error("SPY", "timeout");
        let params = BacktestParams::new("SPY", 5, 10);

        let err = run_pipeline(&source, &params, &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, TrendEdgeError::NoData { reason, .. } if reason == "timeout"));
    }

    #[test]
    fn short_history_is_insufficient() {
        let source = MockPriceSource::new().with_prices("SPY", wavy_prices(30));
        let params = BacktestParams::new("SPY", 5, 50);

        let err = run_pipeline(&source, &params, &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, TrendEdgeError::InsufficientData { bars: 30, .. }));
    }
}

fn price_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..1000.0, 2..120)
}

proptest! {
    #[test]
    fn drawdown_is_never_positive(values in price_strategy()) {
        let prices = make_prices(&values);
        let signal = generate_signal(&prices, 2, 5);
        let table = run_backtest(&prices, &signal);

        for equity in [table.strategy_equity(), table.buyhold_equity()] {
            let dd = max_drawdown(&equity).unwrap();
            prop_assert!(dd.max <= 0.0);
            prop_assert!(dd.series.iter().all(|&d| d <= 0.0 && d > -1.0));
        }
    }

    #[test]
    fn table_aligns_with_prices(values in price_strategy()) {
        let prices = make_prices(&values);
        let signal = generate_signal(&prices, 3, 7);
        let table = run_backtest(&prices, &signal);

        prop_assert_eq!(table.len(), prices.len());
        prop_assert_eq!(table.dates(), prices.index().to_vec());
        prop_assert_eq!(table.rows[0].held, Position::Flat);
        prop_assert_eq!(table.rows[0].eq_strategy, 1.0);
    }

    #[test]
    fn strategy_return_is_zero_or_buyhold(values in price_strategy()) {
        let prices = make_prices(&values);
        let signal = generate_signal(&prices, 2, 4);
        let table = run_backtest(&prices, &signal);

        for row in &table.rows {
            prop_assert!(row.ret_strategy == 0.0 || row.ret_strategy == row.ret_buyhold);
        }
    }

    #[test]
    fn signal_is_flat_during_warmup(values in price_strategy(), slow in 3usize..20) {
        let prices = make_prices(&values);
        let signal = generate_signal(&prices, 2, slow);

        let warmup = (slow - 1).min(signal.len());
        prop_assert!(signal.values()[..warmup].iter().all(|p| *p == Position::Flat));
    }
}

#[test]
fn timeseries_rejects_unsorted_dates() {
    let d = make_dates(2);
    let err = TimeSeries::prices(vec![(d[1], 1.0), (d[0], 2.0)]).unwrap_err();
    assert!(matches!(err, TrendEdgeError::InvalidSeries { .. }));
}
