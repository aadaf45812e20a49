use rand::Rng;
use std::env;
use std::fs::{self, File};
use std::io::{BufWriter, Write};

const DIRECTORS: [&str; 8] = [
    "Christopher Nolan",
    "Steven Spielberg",
    "Martin Scorsese",
    "Akira Kurosawa",
    "Hayao Miyazaki",
    "Quentin Tarantino",
    "Stanley Kubrick",
    "Denis Villeneuve",
];

/// Formats `n` with thousands separators, e.g. 1234567 -> "1,234,567"
fn grouped(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn main() -> std::io::Result<()> {
    let rows: usize = env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(100_000);
    let path = "data/top_movies_synthetic.csv";
    fs::create_dir_all("data")?;
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(
        writer,
        "Series_Title,Released_Year,Director,Gross,IMDB_Rating,No_of_Votes"
    )?;

    let mut rng = rand::rng();
    for i in 0..rows {
        // roughly one record in fifty carries a value the cleaner must drop
        let year = if rng.random_range(0..50) == 0 {
            "PG".to_string()
        } else {
            rng.random_range(1920..2024).to_string()
        };
        let gross = if rng.random_range(0..50) == 0 {
            String::new()
        } else {
            format!("\"{}\"", grouped(rng.random_range(10_000..900_000_000)))
        };
        let director = DIRECTORS[rng.random_range(0..DIRECTORS.len())];
        let rating = rng.random_range(60..95) as f64 / 10.0;
        let votes = rng.random_range(25_000..2_500_000);

        writeln!(
            writer,
            "\"Movie {}, Part {}\",{},{},{},{:.1},{}",
            i,
            i % 3 + 1,
            year,
            director,
            gross,
            rating,
            votes
        )?;
    }
    writer.flush()?;

    println!("Sample CSV generated: {} ({} rows)", path, rows);
    Ok(())
}
