// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

mod helpers;
