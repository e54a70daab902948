use charon_scheduler::utils::threads::Threads;
use jiff::{SignedDuration, SpanRelativeTo, civil::DateTime};

pub fn parse_duration(input: &str) -> Result<SignedDuration, String> {
    if let Ok(duration) = input.parse::<SignedDuration>() {
        return Ok(duration);
    }

    if let Ok(duration) = input
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        return Ok(duration);
    }

    if let Ok(seconds) = input.parse::<i64>() {
        return Ok(SignedDuration::from_secs(seconds.abs()));
    }

    Err(String::from("Invalid duration"))
}

/// 0 means one thread per core.
pub fn threads(count: usize) -> Threads {
    match count {
        0 => Threads::Auto,
        1 => Threads::Single,
        count => Threads::Multi(count),
    }
}

/// `start,length,end` where start and end are civil times and length a duration.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitSpec {
    pub start: DateTime,
    pub length: SignedDuration,
    pub end: DateTime,
}

fn parse_datetime(input: &str) -> Result<DateTime, String> {
    input
        .parse::<DateTime>()
        .or_else(|_| DateTime::strptime("%Y-%m-%d %H:%M:%S", input))
        .map_err(|err| format!("Invalid time {input}: {err}"))
}

pub fn parse_split(input: &str) -> Result<SplitSpec, String> {
    let parts = input.split(',').map(str::trim).collect::<Vec<_>>();
    let [start, length, end] = parts.as_slice() else {
        return Err(String::from("Expected start,length,end"));
    };

    Ok(SplitSpec {
        start: parse_datetime(start)?,
        length: parse_duration(length)?,
        end: parse_datetime(end)?,
    })
}
