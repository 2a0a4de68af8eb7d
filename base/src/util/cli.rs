use std::fmt::Debug;
use std::io::{stdin, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use arrayvec::ArrayVec;
use structopt::StructOpt;

use crate::defs::{Error, ErrorKind::*, Result};
use crate::util::fs;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Array<T: FromStr, const N: usize>(pub [T; N]);

impl<T: Debug + Default + FromStr, const N: usize> FromStr for Array<T, N> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed_err = || {
            let desc = format!("malformed value array '{}'", s);
            Error::new(MalformedData, desc)
        };

        let parse = |iter: &mut std::str::Split<char>| {
            let part = iter.next().ok_or_else(malformed_err)?;
            if part.is_empty() {
                Ok(T::default())
            } else {
                part.trim().parse::<T>().map_err(|_| malformed_err())
            }
        };

        let mut iter = s.split(',');
        let mut vec = ArrayVec::<T, N>::new();

        for _ in 0..N {
            vec.push(parse(&mut iter)?);
        }

        if iter.next().is_some() {
            return Err(malformed_err());
        }

        vec.into_inner().map(Array).map_err(|_| malformed_err())
    }
}

impl<T: FromStr, const N: usize> From<[T; N]> for Array<T, N> {
    fn from(array: [T; N]) -> Self {
        Self(array)
    }
}

#[derive(StructOpt)]
pub struct JsonInput {
    #[structopt(help = "Input .json file (STDIN if omitted)", name = "in-file")]
    pub path: Option<PathBuf>,
}

impl JsonInput {
    pub fn get(&self) -> Result<Box<dyn Read>> {
        Ok(if let Some(path) = &self.path {
            Box::new(fs::open_file(path)?) as Box<dyn Read>
        } else {
            Box::new(stdin()) as Box<dyn Read>
        })
    }

    // Directory against which relative paths inside the input are resolved.
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
