use approx::assert_relative_eq;
use genomic_dotprod::codec::{OwnedPackedGenotypes, PopulationBuilder};
use genomic_dotprod::matrix::{diagonal_offset, off_diagonal_index, packed_len};
use genomic_dotprod::snpbin::MAX_PLOIDY;
use genomic_dotprod::{
    api, dot_product, pairwise_dot_products, ComputeConfig, DotProductMode, GenotypeError, LocusStats, Ploidy,
    Population,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_rows(seed: u64, n: usize, n_loci: usize, ploidy: u8, missing_rate: f64) -> Vec<Vec<Option<u8>>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            (0..n_loci)
                .map(|_| {
                    if rng.random_bool(missing_rate) {
                        None
                    } else {
                        Some(rng.random_range(0..=ploidy))
                    }
                })
                .collect()
        })
        .collect()
}

fn pack(rows: &[Vec<Option<u8>>], n_loci: usize, ploidy: u8) -> OwnedPackedGenotypes {
    let mut builder = PopulationBuilder::new(n_loci);
    for row in rows {
        builder.push_dosages(row, ploidy).unwrap();
    }
    builder.finish()
}

fn random_population(seed: u64, n: usize, n_loci: usize) -> Population {
    let owned = pack(&random_rows(seed, n, n_loci, 2, 0.1), n_loci, 2);
    Population::decode(&owned.view().unwrap())
}

fn random_stats(seed: u64, n_loci: usize) -> (Vec<f64>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mean = (0..n_loci).map(|_| rng.random_range(0.0..2.0)).collect();
    let sd = (0..n_loci).map(|_| rng.random_range(0.2..1.5)).collect();
    (mean, sd)
}

#[test]
fn similarity_is_symmetric() {
    let pop = random_population(1, 12, 70);
    let (mean, sd) = random_stats(2, 70);
    for mode in [DotProductMode::Dosage, DotProductMode::Frequency] {
        for i in 0..pop.len() {
            for j in 0..pop.len() {
                assert_eq!(
                    dot_product(&pop[i], &pop[j], &mean, &sd, mode),
                    dot_product(&pop[j], &pop[i], &mean, &sd, mode)
                );
            }
        }
    }
}

#[test]
fn diagonal_is_sum_of_squared_dosages_with_zero_mean_unit_sd() {
    init_logging();
    let rows = random_rows(3, 9, 41, 2, 0.2);
    let owned = pack(&rows, 41, 2);
    let pop = Population::decode(&owned.view().unwrap());
    let tri = pairwise_dot_products(&pop, &[0.0; 41], &[1.0; 41], &ComputeConfig::new().with_threads(3)).unwrap();

    for (i, row) in rows.iter().enumerate() {
        let expected: f64 = row.iter().flatten().map(|&d| f64::from(d) * f64::from(d)).sum();
        assert_eq!(tri.diagonal()[i], expected);
        assert!(tri.diagonal()[i] >= 0.0);
    }
}

#[test]
fn near_zero_sd_behaves_like_unit_sd() {
    let pop = random_population(4, 8, 30);
    let (mean, mut sd) = random_stats(5, 30);
    let config = ComputeConfig::new().with_threads(2);

    sd[7] = 0.0;
    let with_zero = pairwise_dot_products(&pop, &mean, &sd, &config).unwrap();
    sd[7] = 3e-11;
    let with_tiny = pairwise_dot_products(&pop, &mean, &sd, &config).unwrap();
    sd[7] = 1.0;
    let with_one = pairwise_dot_products(&pop, &mean, &sd, &config).unwrap();

    assert_eq!(with_zero.as_slice(), with_tiny.as_slice());
    assert_eq!(with_zero.as_slice(), with_one.as_slice());
    assert!(with_zero.as_slice().iter().all(|v| v.is_finite()));
}

#[test]
fn missing_locus_never_contributes() {
    let n_loci = 25;
    let mut rows = random_rows(6, 7, n_loci, 2, 0.05);
    rows[0][11] = None;
    let owned = pack(&rows, n_loci, 2);
    let pop = Population::decode(&owned.view().unwrap());
    let (mut mean, mut sd) = random_stats(7, n_loci);
    let config = ComputeConfig::new().with_threads(4);

    let before = pairwise_dot_products(&pop, &mean, &sd, &config).unwrap();
    mean[11] += 17.0;
    sd[11] *= 0.01;
    let after = pairwise_dot_products(&pop, &mean, &sd, &config).unwrap();

    for j in 0..pop.len() {
        assert_eq!(before.get(0, j), after.get(0, j), "pair (0, {})", j);
    }
}

#[test]
fn packing_maps_four_individuals_onto_distinct_slots() {
    let n = 4;
    let mut seen = vec![false; packed_len(n)];
    for i in 0..n {
        for j in (i + 1)..n {
            let k = off_diagonal_index(n, i, j);
            assert!(k < 6);
            assert!(!seen[k], "collision at {}", k);
            seen[k] = true;
        }
    }
    assert!(seen[..6].iter().all(|&s| s));
    assert_eq!(diagonal_offset(n), 6);
}

#[test]
fn integer_and_frequency_sums_exclude_missing() {
    let rows = vec![
        vec![Some(1), Some(2)],
        vec![None, Some(3)],
        vec![Some(2), None],
    ];
    let owned = pack(&rows, 2, 3);

    let mut ints = vec![0i64; 2];
    api::sum_int(framing_of(&owned), &mut ints).unwrap();
    assert_eq!(ints, vec![3, 5]);

    let mut freqs = vec![0.0; 2];
    api::sum_freq(framing_of(&owned), &mut freqs).unwrap();
    assert_relative_eq!(freqs[0], 1.0);
    assert_relative_eq!(freqs[1], 5.0 / 3.0);
}

#[test]
fn max_ploidy_dosages_round_trip_through_sums_and_decoding() {
    let rows = vec![
        vec![Some(MAX_PLOIDY), Some(0), None],
        vec![Some(MAX_PLOIDY), Some(MAX_PLOIDY - 1), Some(MAX_PLOIDY)],
    ];
    let owned = pack(&rows, 3, MAX_PLOIDY);

    let mut ints = vec![0i64; 3];
    api::sum_int(framing_of(&owned), &mut ints).unwrap();
    assert_eq!(ints, vec![2 * 254, 253, 254]);

    let pop = Population::decode(&owned.view().unwrap());
    assert_eq!(pop[0].dosage(0), Some(MAX_PLOIDY));
    assert!(!pop[0].is_missing(0));
    assert!(pop[0].is_missing(2));
    assert_eq!(pop[1].dosage(2), Some(MAX_PLOIDY));
    assert_eq!(pop[1].frequency(2), Some(1.0));
}

#[test]
fn framing_with_more_planes_than_ploidy_is_rejected() {
    let owned = pack(&[vec![Some(2), Some(1)]], 2, 2);
    let mut framing = framing_of(&owned);
    // Three planes over one byte each, for a diploid.
    let gen = [0xFFu8; 3];
    framing.gen = &gen;
    framing.vectors_per_individual = &[3];

    let mut ints = vec![0i64; 2];
    let err = api::sum_int(framing, &mut ints).unwrap_err();
    assert!(matches!(
        err,
        GenotypeError::TooManyPlanes {
            individual: 0,
            planes: 3,
            ploidy: 2
        }
    ));
    assert_eq!(ints, vec![0, 0]);
}

#[test]
fn ploidy_reaching_the_missing_marker_is_rejected() {
    let owned = pack(&[vec![Some(1), Some(0)]], 2, 2);
    let mut framing = framing_of(&owned);
    framing.ploidy = Ploidy::Shared(u8::MAX);

    let mut freqs = vec![0.0; 2];
    let err = api::sum_freq(framing, &mut freqs).unwrap_err();
    assert!(matches!(err, GenotypeError::PloidyTooLarge { individual: 0, ploidy: 255, .. }));

    let err = PopulationBuilder::new(2).push_dosages(&[Some(1), None], u8::MAX).unwrap_err();
    assert!(matches!(err, GenotypeError::PloidyTooLarge { .. }));
}

fn framing_of(owned: &OwnedPackedGenotypes) -> genomic_dotprod::GenlightFraming<'_> {
    genomic_dotprod::GenlightFraming {
        gen: &owned.gen,
        vectors_per_individual: &owned.vectors_per_individual,
        byte_vector_len: owned.byte_vector_len,
        na_per_individual: &owned.na_per_individual,
        na_positions: &owned.na_positions,
        n_individuals: owned.vectors_per_individual.len(),
        n_loci: owned.n_loci,
        ploidy: genomic_dotprod::Ploidy::PerIndividual(&owned.ploidy),
    }
}

#[test]
fn output_is_bit_identical_across_worker_counts() {
    init_logging();
    let pop = random_population(8, 23, 133);
    let (mean, sd) = random_stats(9, 133);
    for mode in [DotProductMode::Dosage, DotProductMode::Frequency] {
        let single = pairwise_dot_products(&pop, &mean, &sd, &ComputeConfig::new().with_mode(mode).with_threads(1)).unwrap();
        for threads in [2, 3, 7, 64] {
            let many = pairwise_dot_products(
                &pop,
                &mean,
                &sd,
                &ComputeConfig::new().with_mode(mode).with_threads(threads),
            )
            .unwrap();
            assert_eq!(single.as_slice(), many.as_slice(), "{:?} with {} workers", mode, threads);
        }
    }
}

#[test]
fn entry_point_matches_engine_on_decoded_population() {
    let rows = random_rows(10, 11, 50, 2, 0.1);
    let owned = pack(&rows, 50, 2);
    let pop = Population::decode(&owned.view().unwrap());
    let stats = LocusStats::from_population(&pop, DotProductMode::Frequency);
    let config = ComputeConfig::new().with_frequency(true).with_threads(3);

    let mut res = vec![0.0; packed_len(pop.len())];
    api::similarity(framing_of(&owned), &stats.mean, &stats.sd, &config, &mut res).unwrap();
    let tri = pairwise_dot_products(&pop, &stats.mean, &stats.sd, &config).unwrap();
    assert_eq!(res, tri.into_vec());
}

#[test]
fn dense_matrix_agrees_with_pairwise_calls() {
    let pop = random_population(11, 6, 19);
    let (mean, sd) = random_stats(12, 19);
    let tri = pairwise_dot_products(&pop, &mean, &sd, &ComputeConfig::new().with_threads(2)).unwrap();
    let dense = tri.to_dense();
    for i in 0..pop.len() {
        for j in 0..pop.len() {
            assert_relative_eq!(
                dense[[i, j]],
                dot_product(&pop[i], &pop[j], &mean, &sd, DotProductMode::Dosage)
            );
        }
    }
}
