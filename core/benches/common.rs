// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use arrow_views::Value;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Returns fixed seedable RNG
pub fn seedable_rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

/// Creates `size` string values with lengths in `0..max_len`, about `null_density` of them null.
pub fn create_string_values(size: usize, null_density: f32, max_len: usize) -> Vec<Value> {
    let mut rng = seedable_rng();
    (0..size)
        .map(|_| {
            if rng.random::<f32>() < null_density {
                Value::Null
            } else {
                let len = rng.random_range(0..max_len);
                Value::Utf8((0..len).map(|_| rng.random_range('a'..='z')).collect())
            }
        })
        .collect()
}

/// Creates `size` list values of up to `max_items` integers each.
pub fn create_list_values(size: usize, null_density: f32, max_items: usize) -> Vec<Value> {
    let mut rng = seedable_rng();
    (0..size)
        .map(|_| {
            if rng.random::<f32>() < null_density {
                Value::Null
            } else {
                let len = rng.random_range(0..max_items);
                Value::List((0..len).map(|_| Value::Int32(rng.random())).collect())
            }
        })
        .collect()
}
